use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::chain::frames::FrameMaterializer;
use crate::foundation::core::{FrameNumber, FrameSize, Timecode};
use crate::foundation::error::{SpliceError, SpliceResult};
use crate::media::probe::FfprobeProbe;
use crate::media::run::{capture, ensure_parent_dir, is_tool_on_path};
use crate::timeline::segment::{Segment, SegmentBody};

/// How much of a clip's end is copied out before counting its frames.
const LAST_FRAME_WINDOW: Timecode = Timecode::from_secs(5);

/// Produces still frames with ffmpeg, ffprobe and ImageMagick.
#[derive(Default)]
pub struct FfmpegMaterializer {
    probe: FfprobeProbe,
}

impl FfmpegMaterializer {
    /// Materializer with an empty probe cache.
    pub fn new() -> Self {
        Self::default()
    }
}

fn ffmpeg_base() -> Vec<OsString> {
    vec!["-y".into(), "-nostdin".into(), "-v".into(), "error".into()]
}

/// `__<name>` beside `media`: the tail copy used to find the last frame.
fn scratch_path(media: &Path) -> PathBuf {
    let name = media
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    media.with_file_name(format!("__{name}"))
}

/// `convert` argument list placing `page` of `document` centred on a grey canvas.
pub fn convert_args(
    document: &Path,
    page: FrameNumber,
    size: FrameSize,
    dest: &Path,
) -> Vec<OsString> {
    let page = match page {
        FrameNumber::Index(n) => n.to_string(),
        FrameNumber::Last => "-1".to_owned(),
    };
    let mut input = document.as_os_str().to_owned();
    input.push(format!("[{page}]"));

    let size = size.to_string();
    let mut args: Vec<OsString> = [
        "-size",
        size.as_str(),
        "-density",
        "600",
        "xc:dimgrey",
        "null:",
        "(",
    ]
    .map(OsString::from)
    .to_vec();
    args.push(input);
    args.extend(
        [
            "-resize",
            size.as_str(),
            "-background",
            "white",
            "-alpha",
            "remove",
            "-type",
            "truecolor",
            "-define",
            "colorspace:auto-grayscale=off",
            ")",
            "-gravity",
            "center",
            "-layers",
            "composite",
            "-flatten",
        ]
        .map(OsString::from),
    );
    args.push(dest.as_os_str().to_owned());
    args
}

impl FrameMaterializer for FfmpegMaterializer {
    fn render_segment(&mut self, segment: &Segment, dest: &Path) -> SpliceResult<()> {
        let map = match segment.body {
            SegmentBody::Audio { stream } => format!("0:a:{stream}"),
            SegmentBody::Video { stream } => format!("0:v:{stream}"),
            SegmentBody::Frame(_) => {
                return Err(SpliceError::chain(
                    segment.number,
                    "a still frame has no media to render",
                ));
            }
        };
        ensure_parent_dir(dest)?;
        let start = segment.punch_in.seconds_string();
        let duration = segment.duration().seconds_string();
        let mut args = ffmpeg_base();
        args.extend(
            [
                "-ss",
                start.as_str(),
                "-t",
                duration.as_str(),
                "-i",
                segment.input.as_str(),
                "-codec",
                "copy",
                "-map",
                map.as_str(),
            ]
            .map(OsString::from),
        );
        args.push(dest.as_os_str().to_owned());
        capture("ffmpeg", "render segment", Path::new(&segment.input), args)?;
        Ok(())
    }

    fn extract_frame(
        &mut self,
        media: &Path,
        frame: FrameNumber,
        dest: &Path,
    ) -> SpliceResult<()> {
        ensure_parent_dir(dest)?;
        let (source, index, scratch) = match frame {
            FrameNumber::Index(n) => (media.to_path_buf(), u64::from(n), None),
            FrameNumber::Last => {
                let scratch = scratch_path(media);
                let frames = self.copy_tail(media, &scratch).and_then(|()| {
                    let info = self.probe.info(&scratch)?;
                    info.video_frames.ok_or_else(|| {
                        SpliceError::external(
                            "ffprobe",
                            "count frames",
                            &scratch,
                            "no nb_frames for the video stream",
                        )
                    })
                });
                let frames = match frames {
                    Ok(n) => n,
                    Err(e) => {
                        let _ = std::fs::remove_file(&scratch);
                        return Err(e);
                    }
                };
                (scratch.clone(), frames.saturating_sub(1), Some(scratch))
            }
        };

        let select = format!("select='eq(n,{index})'");
        let mut args = ffmpeg_base();
        args.extend(["-i".into(), source.into_os_string()]);
        args.extend(
            [
                "-filter:v",
                select.as_str(),
                "-frames:v",
                "1",
                "-f",
                "image2",
                "-map",
                "0:v",
            ]
            .map(OsString::from),
        );
        args.push(dest.as_os_str().to_owned());
        let result = capture("ffmpeg", "extract frame", media, args);

        if let Some(scratch) = scratch {
            let _ = std::fs::remove_file(scratch);
        }
        result.map(drop)
    }

    fn rasterize_document(
        &mut self,
        document: &Path,
        page: FrameNumber,
        size: FrameSize,
        dest: &Path,
    ) -> SpliceResult<()> {
        if !document.exists() {
            return Err(SpliceError::external(
                "convert",
                "rasterize",
                document,
                "file does not exist",
            ));
        }
        ensure_parent_dir(dest)?;
        // ImageMagick 7 ships `magick`; 6 only `convert`.
        let tool = if is_tool_on_path("convert") {
            "convert"
        } else {
            "magick"
        };
        capture(
            tool,
            "rasterize",
            document,
            convert_args(document, page, size, dest),
        )?;
        Ok(())
    }
}

impl FfmpegMaterializer {
    /// Stream-copy the last few seconds of `media`'s video into `scratch`.
    fn copy_tail(&mut self, media: &Path, scratch: &Path) -> SpliceResult<()> {
        let duration = self.probe.info(media)?.duration;
        let start = duration
            .checked_sub(LAST_FRAME_WINDOW)
            .unwrap_or(Timecode::ZERO);
        let mut args = ffmpeg_base();
        args.extend([
            "-ss".into(),
            start.seconds_string().into(),
            "-i".into(),
            media.as_os_str().to_owned(),
        ]);
        args.extend(["-codec:v", "copy", "-map", "0:v"].map(OsString::from));
        args.push(scratch.as_os_str().to_owned());
        capture("ffmpeg", "copy last seconds", media, args)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/materialize.rs"]
mod tests;
