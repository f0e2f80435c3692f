use super::*;

const SAMPLE: &str = r#"{
    "streams": [
        { "index": 0, "codec_type": "audio", "sample_rate": "48000" },
        { "index": 1, "codec_type": "video", "width": 1280, "height": 720, "nb_frames": "751" }
    ],
    "format": { "filename": "talk.mov", "duration": "30.041667", "size": "1024" }
}"#;

#[test]
fn parses_duration_size_and_frames() {
    let info = parse_probe_output(SAMPLE.as_bytes(), Path::new("talk.mov")).unwrap();
    assert_eq!(info.duration, Timecode::from_millis(30_041));
    assert_eq!(
        info.video_size,
        Some(FrameSize {
            width: 1280,
            height: 720
        })
    );
    assert_eq!(info.video_frames, Some(751));
}

#[test]
fn audio_only_files_have_no_video_details() {
    let json = r#"{"streams":[{"codec_type":"audio"}],"format":{"duration":"12.5"}}"#;
    let info = parse_probe_output(json.as_bytes(), Path::new("talk.wav")).unwrap();
    assert_eq!(info.duration, Timecode::from_millis(12_500));
    assert_eq!(info.video_size, None);
    assert_eq!(info.video_frames, None);
}

#[test]
fn missing_or_unreadable_duration_is_a_tool_error() {
    for json in [
        r#"{"streams":[],"format":{}}"#,
        r#"{"streams":[],"format":{"duration":"N/A"}}"#,
        "not json",
    ] {
        let err = parse_probe_output(json.as_bytes(), Path::new("x.png")).unwrap_err();
        let SpliceError::ExternalTool { tool, path, .. } = &err else {
            panic!("expected external tool error, got {err}");
        };
        assert_eq!(tool, "ffprobe");
        assert_eq!(path, "x.png");
    }
}
