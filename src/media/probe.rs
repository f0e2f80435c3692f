use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::foundation::core::{FrameSize, Timecode};
use crate::foundation::error::{SpliceError, SpliceResult};
use crate::media::run::capture;
use crate::timeline::resolve::DurationProbe;

/// What ffprobe told us about one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaInfo {
    /// Container duration.
    pub duration: Timecode,
    /// Dimensions of the first video stream.
    pub video_size: Option<FrameSize>,
    /// `nb_frames` of the first video stream, when the container records it.
    pub video_frames: Option<u64>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(json: &[u8], path: &Path) -> SpliceResult<MediaInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json).map_err(|e| {
        SpliceError::external("ffprobe", "parse output", path, format!("invalid json: {e}"))
    })?;
    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| SpliceError::external("ffprobe", "read duration", path, "no duration"))?;
    let duration = Timecode::parse_decimal_secs(&duration)
        .map_err(|e| SpliceError::external("ffprobe", "read duration", path, e.to_string()))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let video_size = video.and_then(|s| match (s.width, s.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            Some(FrameSize { width, height })
        }
        _ => None,
    });
    let video_frames = video
        .and_then(|s| s.nb_frames.as_deref())
        .and_then(|n| n.trim().parse().ok());

    Ok(MediaInfo {
        duration,
        video_size,
        video_frames,
    })
}

struct CacheEntry {
    modified: Option<SystemTime>,
    info: MediaInfo,
}

/// [`DurationProbe`] backed by ffprobe, caching one result per file.
///
/// A cached result is dropped once the file's modification time moves past the
/// time recorded when it was probed.
#[derive(Default)]
pub struct FfprobeProbe {
    cache: HashMap<PathBuf, CacheEntry>,
    runs: usize,
}

impl FfprobeProbe {
    /// Probe with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times ffprobe has actually been run.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Everything ffprobe reports for `path`, from the cache when still current.
    pub fn info(&mut self, path: &Path) -> SpliceResult<MediaInfo> {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        if let Some(entry) = self.cache.get(path) {
            let stale = match (entry.modified, modified) {
                (Some(then), Some(now)) => now > then,
                _ => false,
            };
            if !stale {
                return Ok(entry.info.clone());
            }
            tracing::debug!(path = %path.display(), "file changed since last probe");
        }

        let args = [
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]
        .map(OsStr::new);
        let json = capture(
            "ffprobe",
            "probe",
            path,
            args.into_iter().chain([path.as_os_str()]),
        )?;
        self.runs += 1;
        let info = parse_probe_output(&json, path)?;
        tracing::debug!(path = %path.display(), duration = %info.duration, "probed");
        self.cache.insert(
            path.to_path_buf(),
            CacheEntry {
                modified,
                info: info.clone(),
            },
        );
        Ok(info)
    }
}

impl DurationProbe for FfprobeProbe {
    fn duration(&mut self, path: &Path) -> SpliceResult<Timecode> {
        Ok(self.info(path)?.duration)
    }

    fn video_size(&mut self, path: &Path) -> SpliceResult<Option<FrameSize>> {
        Ok(self.info(path)?.video_size)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/probe.rs"]
mod tests;
