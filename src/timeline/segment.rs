use crate::foundation::core::{FrameNumber, MediaKind, Timecode};
use crate::foundation::error::{SpliceError, SpliceResult};
use crate::timeline::registry::InputRegistry;

/// A bounded slice of one input stream, numbered permanently at creation.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Segment {
    /// Creation-order number; unique within one compilation run.
    pub number: usize,
    /// Punch-in point within the source.
    pub punch_in: Timecode,
    /// Punch-out point within the source; never before `punch_in`.
    pub punch_out: Timecode,
    /// Registry key this segment reads from.
    pub input: String,
    /// Kind-specific data.
    pub body: SegmentBody,
}

/// Kind-specific part of a [`Segment`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SegmentBody {
    /// Audio stream `stream` of the input.
    Audio {
        /// Stream index among the input's audio streams.
        stream: u32,
    },
    /// Video stream `stream` of the input.
    Video {
        /// Stream index among the input's video streams.
        stream: u32,
    },
    /// A still image held for the segment's duration.
    Frame(FrameSegment),
}

/// Frame-specific state of a segment.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct FrameSegment {
    /// Which frame (or page) of the source to show.
    pub frame: FrameNumber,
    /// Where the frame's image comes from and whether it exists yet.
    pub state: FrameState,
}

/// Still-frame lifecycle: `Pending -> Materializing -> Resolved`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameState {
    /// The image has not been requested yet.
    Pending(FrameSource),
    /// The image has been requested from the materializer.
    Materializing(FrameSource),
    /// A concrete image file backs the segment.
    Resolved {
        /// Path of the image, also the segment's registry key.
        image: String,
    },
}

/// Source of a frame that still has to be produced.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSource {
    /// `^`: a frame of the immediately preceding segment's output.
    PreviousSegment,
    /// One page of a paginated document.
    Document {
        /// Document file.
        path: String,
        /// Page to rasterize.
        page: FrameNumber,
    },
}

/// Extensions treated as paginated documents that need rasterizing.
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "ps", "eps", "tif", "tiff"];

impl FrameSource {
    /// Classify a frame's configured file; `None` for a plain still image.
    pub fn for_file(path: &str, page: FrameNumber) -> Option<Self> {
        let ext = std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)?;
        DOCUMENT_EXTENSIONS
            .contains(&ext.as_str())
            .then(|| Self::Document {
                path: path.to_owned(),
                page,
            })
    }
}

impl Segment {
    /// Media kind of the body.
    pub fn kind(&self) -> MediaKind {
        match self.body {
            SegmentBody::Audio { .. } => MediaKind::Audio,
            SegmentBody::Video { .. } => MediaKind::Video,
            SegmentBody::Frame(_) => MediaKind::Frame,
        }
    }

    /// `punch_out - punch_in`, exact to the millisecond.
    pub fn duration(&self) -> Timecode {
        self.punch_out
            .checked_sub(self.punch_in)
            .unwrap_or(Timecode::ZERO)
    }

    /// Stream index for audio/video segments.
    pub fn stream(&self) -> Option<u32> {
        match self.body {
            SegmentBody::Audio { stream } | SegmentBody::Video { stream } => Some(stream),
            SegmentBody::Frame(_) => None,
        }
    }

    /// Frame data, for frame segments.
    pub fn frame(&self) -> Option<&FrameSegment> {
        match &self.body {
            SegmentBody::Frame(f) => Some(f),
            _ => None,
        }
    }

    /// True unless this is a frame segment whose image does not exist yet.
    pub fn is_resolved(&self) -> bool {
        self.frame()
            .is_none_or(|f| matches!(f.state, FrameState::Resolved { .. }))
    }

    fn input_index(&self, registry: &InputRegistry) -> SpliceResult<usize> {
        registry.index_of(&self.input).ok_or_else(|| {
            SpliceError::timeline(
                self.number,
                format!("input '{}' is not registered", self.input),
            )
        })
    }

    /// `[n:a]`, `[n:a:1]`, `[n:v]`: the registered input's stream feeding this segment.
    pub fn input_stream_specifier(&self, registry: &InputRegistry) -> SpliceResult<String> {
        let n = self.input_index(registry)?;
        match &self.body {
            SegmentBody::Audio { stream: 0 } => Ok(format!("[{n}:a]")),
            SegmentBody::Audio { stream } => Ok(format!("[{n}:a:{stream}]")),
            SegmentBody::Video { stream: 0 } => Ok(format!("[{n}:v]")),
            SegmentBody::Video { stream } => Ok(format!("[{n}:v:{stream}]")),
            SegmentBody::Frame(f) => match f.state {
                FrameState::Resolved { .. } => Ok(format!("[{n}:v]")),
                _ => Err(SpliceError::chain(
                    self.number,
                    "frame has not been materialized",
                )),
            },
        }
    }

    /// Label of this segment's stream after trimming (`[a3]`, `[v4]`).
    ///
    /// Frames are not trimmed, so they are addressed by their input specifier.
    pub fn output_stream_specifier(&self, registry: &InputRegistry) -> SpliceResult<String> {
        match self.body {
            SegmentBody::Audio { .. } | SegmentBody::Video { .. } => Ok(format!(
                "[{}{}]",
                self.kind().stream_letter(),
                self.number
            )),
            SegmentBody::Frame(_) => self.input_stream_specifier(registry),
        }
    }

    /// `[in] trim=start=S:duration=D,setpts=PTS-STARTPTS [out]`, or `None` for frames.
    pub fn trim_filter(&self, registry: &InputRegistry) -> SpliceResult<Option<String>> {
        let (trim, setpts) = match self.body {
            SegmentBody::Audio { .. } => ("atrim", "asetpts"),
            SegmentBody::Video { .. } => ("trim", "setpts"),
            SegmentBody::Frame(_) => return Ok(None),
        };
        Ok(Some(format!(
            "{} {trim}=start={}:duration={},{setpts}=PTS-STARTPTS {}",
            self.input_stream_specifier(registry)?,
            self.punch_in.seconds_string(),
            self.duration().seconds_string(),
            self.output_stream_specifier(registry)?,
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/segment.rs"]
mod tests;
