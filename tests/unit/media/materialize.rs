use super::*;

fn strings(args: &[OsString]) -> Vec<String> {
    args.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn convert_centres_page_on_grey_canvas() {
    let args = convert_args(
        Path::new("deck.pdf"),
        FrameNumber::Index(4),
        FrameSize::default(),
        Path::new("temp_frame_ep_002.jpg"),
    );
    assert_eq!(
        strings(&args),
        [
            "-size",
            "2048x1536",
            "-density",
            "600",
            "xc:dimgrey",
            "null:",
            "(",
            "deck.pdf[4]",
            "-resize",
            "2048x1536",
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
            "temp_frame_ep_002.jpg",
        ]
    );
}

#[test]
fn last_page_uses_negative_index() {
    let args = convert_args(
        Path::new("scan.tif"),
        FrameNumber::Last,
        FrameSize {
            width: 640,
            height: 480,
        },
        Path::new("out.jpg"),
    );
    let args = strings(&args);
    assert!(args.contains(&"scan.tif[-1]".to_owned()));
    assert_eq!(args[1], "640x480");
}

#[test]
fn scratch_file_sits_beside_media() {
    assert_eq!(
        scratch_path(Path::new("out/temp_video_ep_003.mov")),
        Path::new("out/__temp_video_ep_003.mov")
    );
}

#[test]
fn still_frames_cannot_be_rendered() {
    use crate::timeline::segment::{FrameSegment, FrameState};

    let seg = Segment {
        number: 2,
        punch_in: Timecode::ZERO,
        punch_out: Timecode::from_secs(1),
        input: "a.png".to_owned(),
        body: SegmentBody::Frame(FrameSegment {
            frame: FrameNumber::Index(0),
            state: FrameState::Resolved {
                image: "a.png".to_owned(),
            },
        }),
    };
    let err = FfmpegMaterializer::new()
        .render_segment(&seg, Path::new("never.mov"))
        .unwrap_err();
    assert!(matches!(err, SpliceError::Chain { segment: 2, .. }));
}

#[test]
fn rasterizing_a_missing_document_fails_before_running_tools() {
    let err = FfmpegMaterializer::new()
        .rasterize_document(
            Path::new("definitely/not/here.pdf"),
            FrameNumber::Index(0),
            FrameSize::default(),
            Path::new("out.jpg"),
        )
        .unwrap_err();
    assert!(matches!(err, SpliceError::ExternalTool { .. }), "{err}");
}
