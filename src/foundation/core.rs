use std::fmt;

use crate::foundation::error::{SpliceError, SpliceResult};

/// A non-negative point or span on a source's timeline, in whole milliseconds.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Timecode(pub u64);

impl Timecode {
    /// The start of every timeline.
    pub const ZERO: Self = Self(0);

    /// Build from a clock reading. Fields are not range checked (`90` seconds is fine);
    /// `None` when the total does not fit in a `u64` of milliseconds.
    pub fn from_clock(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<Self> {
        hours
            .checked_mul(60)?
            .checked_add(minutes)?
            .checked_mul(60)?
            .checked_add(seconds)?
            .checked_mul(1000)?
            .checked_add(millis)
            .map(Self)
    }

    /// Build from whole milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Build from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1000)
    }

    /// Total milliseconds.
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// `self - earlier`, or `None` when `earlier` is later than `self`.
    pub fn checked_sub(self, earlier: Self) -> Option<Self> {
        self.0.checked_sub(earlier.0).map(Self)
    }

    /// Saturating addition; timecodes never wrap.
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Parse decimal seconds as printed by ffprobe (`"12.345678"`, `"7"`).
    ///
    /// The fraction follows the configuration grammar: truncated or right-padded to
    /// exactly three digits.
    pub fn parse_decimal_secs(s: &str) -> SpliceResult<Self> {
        let s = s.trim();
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        let invalid = || SpliceError::configuration(format!("unreadable duration '{s}'"));
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let secs: u64 = whole.parse().map_err(|_| invalid())?;
        let millis = if frac.is_empty() {
            0
        } else {
            normalize_millis(frac)
        };
        secs.checked_mul(1000)
            .and_then(|ms| ms.checked_add(millis))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Seconds as used in filter text: `10`, `10.5`, `0.125`.
    pub fn seconds_string(self) -> String {
        let secs = self.0 / 1000;
        let ms = self.0 % 1000;
        if ms == 0 {
            return secs.to_string();
        }
        let frac = format!("{ms:03}");
        format!("{secs}.{}", frac.trim_end_matches('0'))
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0 % 1000;
        let total_secs = self.0 / 1000;
        let (h, m, s) = (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60);
        write!(f, "{h:02}:{m:02}:{s:02}.{ms:03}")
    }
}

/// Fractional-second digits to milliseconds: `"1"` → 100, `"12"` → 120, `"1234"` → 123.
///
/// `digits` must be non-empty ASCII digits.
pub fn normalize_millis(digits: &str) -> u64 {
    digits
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(3)
        .fold(0, |acc, b| acc * 10 + u64::from(b - b'0'))
}

/// Media kind of an input spec or segment.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// An audio stream trimmed with `atrim`.
    Audio,
    /// A video stream trimmed with `trim`.
    Video,
    /// A still frame looped for the segment's duration.
    Frame,
}

impl MediaKind {
    /// Long lowercase name used in logs and temp-file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Frame => "frame",
        }
    }

    /// Stream-type letter used in stream specifiers. Frames are video streams.
    pub fn stream_letter(self) -> char {
        match self {
            Self::Audio => 'a',
            Self::Video | Self::Frame => 'v',
        }
    }

    /// Suffix for the temporary file holding one rendered segment of this kind.
    pub fn temp_suffix(self) -> &'static str {
        match self {
            Self::Audio => "wav",
            Self::Video => "mov",
            Self::Frame => "jpg",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which frame of a source a frame segment shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameNumber {
    /// 0-based frame or page index.
    Index(u32),
    /// The source's final frame (`-1` / `last` in configuration text).
    Last,
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(n) => write!(f, "{n}"),
            Self::Last => f.write_str("last"),
        }
    }
}

/// Pixel dimensions of a still frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 1536,
        }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
