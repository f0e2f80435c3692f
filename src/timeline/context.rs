use crate::foundation::core::Timecode;
use crate::timeline::registry::InputRegistry;
use crate::timeline::segment::{FrameState, Segment, SegmentBody};

/// State scoped to one compilation run: the input registry and segment numbering.
///
/// Independent runs (and tests) each start from [`CompilationContext::new`] or call
/// [`CompilationContext::reset`] so indices never leak between them.
#[derive(Debug, Default)]
pub struct CompilationContext {
    registry: InputRegistry,
    next_segment: usize,
}

impl CompilationContext {
    /// Context with an empty registry, numbering from 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all inputs and restart numbering.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.next_segment = 0;
    }

    /// Inputs registered so far.
    pub fn registry(&self) -> &InputRegistry {
        &self.registry
    }

    /// Mutable registry, for renaming materialized frames.
    pub fn registry_mut(&mut self) -> &mut InputRegistry {
        &mut self.registry
    }

    /// Number the next created segment will receive.
    pub fn next_segment_number(&self) -> usize {
        self.next_segment
    }

    /// Number a new segment and register its input.
    ///
    /// Resolved still images get `-loop 1 -t <duration>` attached to their entry.
    pub fn create_segment(
        &mut self,
        punch_in: Timecode,
        punch_out: Timecode,
        input: String,
        body: SegmentBody,
    ) -> Segment {
        let segment = Segment {
            number: self.next_segment,
            punch_in,
            punch_out,
            input,
            body,
        };
        self.next_segment += 1;

        match segment.frame().map(|f| &f.state) {
            Some(FrameState::Resolved { .. }) => {
                let options = still_options(segment.duration());
                if let Some(previous) = self.registry.options_of(&segment.input)
                    && !previous.is_empty()
                    && previous != options.as_slice()
                {
                    tracing::warn!(
                        segment = segment.number,
                        image = %segment.input,
                        previous = %previous.join(" "),
                        now = %options.join(" "),
                        "still image reused with a different duration; all uses loop for the last one"
                    );
                }
                self.registry
                    .register_with_options(&segment.input, options);
            }
            _ => {
                self.registry.register(&segment.input);
            }
        }
        tracing::debug!(
            segment = segment.number,
            kind = %segment.kind(),
            input = %segment.input,
            punch_in = %segment.punch_in,
            punch_out = %segment.punch_out,
            "created segment"
        );
        segment
    }
}

/// Input options that loop a still image for `duration`.
pub fn still_options(duration: Timecode) -> Vec<String> {
    vec![
        "-loop".to_owned(),
        "1".to_owned(),
        "-t".to_owned(),
        duration.seconds_string(),
    ]
}

/// Placeholder registry key for a frame whose image does not exist yet.
pub(crate) fn pending_key(source: &str, segment: usize) -> String {
    format!("{source}#{segment}")
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/context.rs"]
mod tests;
