use std::path::Path;

/// Convenience result type used across podsplice.
pub type SpliceResult<T> = Result<T, SpliceError>;

/// Top-level error taxonomy for the configuration-to-filtergraph pipeline.
#[derive(thiserror::Error, Debug)]
pub enum SpliceError {
    /// Malformed configuration text.
    #[error("syntax error at line {line}, column {column}: {message} (near '{fragment}')")]
    Syntax {
        /// 1-based line of the offending input.
        line: usize,
        /// 1-based column of the offending input.
        column: usize,
        /// Offending text, from the error position to the end of its line.
        fragment: String,
        /// What the parser expected.
        message: String,
    },

    /// Missing defaults, unreadable timestamps or missing duration-reference targets.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A punch-out point that falls before its punch-in point.
    #[error("timeline error in segment {segment}: {message}")]
    Timeline {
        /// Number the segment would have been given.
        segment: usize,
        /// Description including the offending times.
        message: String,
    },

    /// A frame segment whose predecessor is missing or could not be materialized.
    #[error("frame chain error in segment {segment}: {message}")]
    Chain {
        /// The frame segment that could not be resolved.
        segment: usize,
        /// Description of the broken link.
        message: String,
    },

    /// An external media tool failed or returned output we could not read.
    #[error("external tool error: {tool} {operation} failed for '{path}': {message}")]
    ExternalTool {
        /// Tool name (`ffprobe`, `ffmpeg`, `convert`).
        tool: String,
        /// What we asked the tool to do.
        operation: String,
        /// File the operation was about.
        path: String,
        /// Exit status and/or trimmed stderr.
        message: String,
    },

    /// The run was interrupted before the named stage started.
    #[error("interrupted before {stage}")]
    Interrupted {
        /// Stage that was not started.
        stage: String,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpliceError {
    /// Build a [`SpliceError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`SpliceError::Timeline`] value.
    pub fn timeline(segment: usize, msg: impl Into<String>) -> Self {
        Self::Timeline {
            segment,
            message: msg.into(),
        }
    }

    /// Build a [`SpliceError::Chain`] value.
    pub fn chain(segment: usize, msg: impl Into<String>) -> Self {
        Self::Chain {
            segment,
            message: msg.into(),
        }
    }

    /// Build a [`SpliceError::ExternalTool`] value.
    pub fn external(
        tool: impl Into<String>,
        operation: impl Into<String>,
        path: &Path,
        msg: impl Into<String>,
    ) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            operation: operation.into(),
            path: path.display().to_string(),
            message: msg.into(),
        }
    }

    /// Build a [`SpliceError::Syntax`] value from a byte offset into `src`.
    pub fn syntax_at(src: &str, offset: usize, msg: impl Into<String>) -> Self {
        let mut offset = offset.min(src.len());
        while !src.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &src[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        let rest = &src[offset..];
        let fragment = rest.split('\n').next().unwrap_or_default().trim_end();
        Self::Syntax {
            line,
            column,
            fragment: if fragment.is_empty() {
                "<end of input>".to_owned()
            } else {
                fragment.to_owned()
            },
            message: msg.into(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
