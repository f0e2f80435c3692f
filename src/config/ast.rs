use crate::foundation::core::{FrameNumber, MediaKind, Timecode};
use crate::foundation::error::{SpliceError, SpliceResult};

/// A clock reading from configuration text, with milliseconds already normalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ClockTime {
    /// Hours field (0 when omitted).
    pub hours: u64,
    /// Minutes field (0 when omitted).
    pub minutes: u64,
    /// Seconds field.
    pub seconds: u64,
    /// Milliseconds, always three-digit precision.
    pub millis: u64,
}

impl ClockTime {
    /// `00:00:00.000`, inserted ahead of a lonely duration reference.
    pub const ZERO: Self = Self {
        hours: 0,
        minutes: 0,
        seconds: 0,
        millis: 0,
    };

    /// Absolute position on the source timeline.
    pub fn to_timecode(self) -> SpliceResult<Timecode> {
        Timecode::from_clock(self.hours, self.minutes, self.seconds, self.millis).ok_or_else(
            || {
                SpliceError::configuration(format!(
                    "timestamp {}:{:02}:{:02}.{:03} is out of range",
                    self.hours, self.minutes, self.seconds, self.millis
                ))
            },
        )
    }
}

/// One entry of a segment's time list.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeToken {
    /// An explicit punch point.
    Timestamp(ClockTime),
    /// "The duration of this file, added to the preceding timestamp."
    DurationReference {
        /// File whose duration is used.
        filename: String,
    },
}

/// Where an input spec reads from, when it says.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRef {
    /// A file on disk.
    File(String),
    /// `^`: the output of the immediately preceding segment.
    PreviousSegment,
}

/// Parser output for one input of a `[...]` segment spec.
///
/// Omitted fields stay `None`; defaults are applied by the resolver.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct InputSpec {
    /// Always present.
    pub kind: MediaKind,
    /// Source file or `^`.
    pub filename: Option<SourceRef>,
    /// Stream index (audio/video) or frame/page index (frame).
    pub index: Option<FrameNumber>,
    /// Punch points, always starting with a [`TimeToken::Timestamp`] when non-empty.
    pub times: Vec<TimeToken>,
}

impl InputSpec {
    /// Spec reading a whole default stream, as used when no configuration is given.
    pub fn whole(kind: MediaKind, filename: impl Into<String>, index: u32) -> Self {
        Self {
            kind,
            filename: Some(SourceRef::File(filename.into())),
            index: Some(FrameNumber::Index(index)),
            times: Vec::new(),
        }
    }
}
