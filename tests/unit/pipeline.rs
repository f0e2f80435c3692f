use std::collections::HashMap;

use super::*;
use crate::foundation::core::Timecode;
use crate::timeline::resolve::StreamDefault;

#[derive(Default)]
struct FakeProbe {
    files: HashMap<PathBuf, (Timecode, Option<FrameSize>)>,
}

impl FakeProbe {
    fn file(mut self, path: &str, secs: u64, size: Option<(u32, u32)>) -> Self {
        self.files.insert(
            PathBuf::from(path),
            (
                Timecode::from_secs(secs),
                size.map(|(width, height)| FrameSize { width, height }),
            ),
        );
        self
    }
}

impl DurationProbe for FakeProbe {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn duration(&mut self, path: &Path) -> SpliceResult<Timecode> {
        Ok(self.files[path].0)
    }

    fn video_size(&mut self, path: &Path) -> SpliceResult<Option<FrameSize>> {
        Ok(self.files[path].1)
    }
}

#[derive(Default)]
struct SizeRecorder {
    sizes: Vec<FrameSize>,
}

impl FrameMaterializer for SizeRecorder {
    fn render_segment(&mut self, _segment: &Segment, _dest: &Path) -> SpliceResult<()> {
        Ok(())
    }

    fn extract_frame(
        &mut self,
        _media: &Path,
        _frame: FrameNumber,
        _dest: &Path,
    ) -> SpliceResult<()> {
        Ok(())
    }

    fn rasterize_document(
        &mut self,
        _document: &Path,
        _page: FrameNumber,
        size: FrameSize,
        _dest: &Path,
    ) -> SpliceResult<()> {
        self.sizes.push(size);
        Ok(())
    }
}

fn defaults(audio: Option<&str>, video: Option<&str>) -> StreamDefaults {
    StreamDefaults {
        audio: StreamDefault {
            file: audio.map(str::to_owned),
            stream: None,
        },
        video: StreamDefault {
            file: video.map(str::to_owned),
            stream: None,
        },
        frame: StreamDefault::default(),
    }
}

#[test]
fn empty_config_without_defaults_is_rejected() {
    let mut splicer = Splicer::new(
        SpliceOptions::new("out.mov"),
        FakeProbe::default(),
        DryRunMaterializer,
    );
    for config in [Some(""), Some("# nothing\n"), None] {
        let err = splicer.plan(config).unwrap_err();
        assert!(matches!(err, SpliceError::Configuration(_)));
        assert!(err.to_string().contains("must specify at least one input"));
    }
}

#[test]
fn no_config_uses_default_streams_whole() {
    let mut options = SpliceOptions::new("out.mov");
    options.defaults = defaults(Some("talk.wav"), Some("talk.mov"));
    let probe = FakeProbe::default()
        .file("talk.wav", 90, None)
        .file("talk.mov", 90, Some((1920, 1080)));
    let mut splicer = Splicer::new(options, probe, DryRunMaterializer);

    let plan = splicer.plan(None).unwrap();
    assert_eq!(
        plan.filter_graph,
        [
            "[0:a] atrim=start=0:duration=90,asetpts=PTS-STARTPTS [a0]",
            "[1:v] trim=start=0:duration=90,setpts=PTS-STARTPTS [v1]",
            "[a0] anull [aconc]",
            "[aconc] dynaudnorm=r=0.25:f=10:b=y [anorm]",
            "[v1] null [vconc]",
        ]
        .join(";")
    );
    let paths: Vec<_> = plan.inputs.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["talk.wav", "talk.mov"]);
}

#[test]
fn planning_twice_starts_from_a_clean_context() {
    let probe = FakeProbe::default().file("clip.mp4", 30, None);
    let mut splicer = Splicer::new(SpliceOptions::new("out.mov"), probe, DryRunMaterializer);
    let first = splicer.plan(Some("[v:clip.mp4:0] 10 20")).unwrap();
    let second = splicer.plan(Some("[v:clip.mp4:0] 10 20")).unwrap();
    assert_eq!(first.filter_graph, second.filter_graph);
    assert_eq!(second.timeline.segments()[0].number, 0);
    assert_eq!(second.inputs.len(), 1);
}

#[test]
fn caret_on_first_segment_stops_before_compiling() {
    let mut splicer = Splicer::new(
        SpliceOptions::new("out.mov"),
        FakeProbe::default(),
        DryRunMaterializer,
    );
    let err = splicer.plan(Some("[f:^:-1] 0 5")).unwrap_err();
    assert!(matches!(err, SpliceError::Chain { segment: 0, .. }), "{err}");
}

#[test]
fn document_pages_use_first_video_size() {
    let probe = FakeProbe::default()
        .file("talk.wav", 60, None)
        .file("talk.mov", 60, Some((1280, 720)));
    let mut splicer = Splicer::new(SpliceOptions::new("ep.mov"), probe, SizeRecorder::default());
    let plan = splicer
        .plan(Some("[a:talk.wav] 0 10\n[f:deck.pdf:1] 0 5\n[v:talk.mov] 0 5"))
        .unwrap();
    assert_eq!(
        splicer.materializer().sizes,
        [FrameSize {
            width: 1280,
            height: 720
        }]
    );
    assert_eq!(plan.inputs[1].path, "temp_frame_ep_001.jpg");
    assert_eq!(plan.inputs[1].options, ["-loop", "1", "-t", "5"]);
}

#[test]
fn configured_frame_size_wins() {
    let mut options = SpliceOptions::new("ep.mov");
    options.frame_size = Some(FrameSize {
        width: 800,
        height: 600,
    });
    let probe = FakeProbe::default().file("talk.mov", 60, Some((1280, 720)));
    let mut splicer = Splicer::new(options, probe, SizeRecorder::default());
    splicer
        .plan(Some("[v:talk.mov] 0 5\n[f:deck.pdf] 0 5"))
        .unwrap();
    assert_eq!(splicer.materializer().sizes[0].to_string(), "800x600");
}

#[test]
fn cleanup_respects_keep() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ep.mov");
    let probe = FakeProbe::default().file("talk.mov", 60, None);

    let mut options = SpliceOptions::new(&output);
    options.keep_temp_files = true;
    let mut splicer = Splicer::new(options, probe, DryRunMaterializer);
    splicer
        .plan(Some("[v:talk.mov] 0 5\n[f:^] 0 2"))
        .unwrap();
    let image = dir.path().join("temp_frame_ep_001.jpg");
    std::fs::write(&image, b"jpg").unwrap();

    assert_eq!(splicer.cleanup(), 0);
    assert!(image.exists());
    assert_eq!(splicer.artifacts().paths().len(), 2);
}

#[test]
fn cleanup_removes_generated_frames() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ep.mov");
    let probe = FakeProbe::default().file("talk.mov", 60, None);
    let mut splicer = Splicer::new(SpliceOptions::new(&output), probe, DryRunMaterializer);
    splicer
        .plan(Some("[v:talk.mov] 0 5\n[f:^] 0 2"))
        .unwrap();
    let image = dir.path().join("temp_frame_ep_001.jpg");
    std::fs::write(&image, b"jpg").unwrap();

    assert_eq!(splicer.cleanup(), 1);
    assert!(!image.exists());
}

#[test]
fn plan_serializes_for_inspection() {
    let probe = FakeProbe::default().file("clip.mp4", 30, None);
    let mut splicer = Splicer::new(SpliceOptions::new("out.mov"), probe, DryRunMaterializer);
    let plan = splicer.plan(Some("[v:clip.mp4:0] 10 20")).unwrap();
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(
        json["filter_graph"],
        "[0:v] trim=start=10:duration=10,setpts=PTS-STARTPTS [v0];[v0] null [vconc]"
    );
    assert_eq!(json["timeline"]["segments"][0]["body"]["kind"], "video");
    assert_eq!(json["inputs"][0]["path"], "clip.mp4");
}

#[test]
fn frame_default_alone_is_used_whole() {
    let mut options = SpliceOptions::new("out.mov");
    options.defaults.frame = StreamDefault {
        file: Some("cover.png".to_owned()),
        stream: None,
    };
    let mut splicer = Splicer::new(options, FakeProbe::default(), DryRunMaterializer);

    let plan = splicer.plan(None).unwrap();
    assert_eq!(plan.timeline.segments().len(), 1);
    assert_eq!(plan.timeline.segments()[0].kind(), MediaKind::Frame);
    assert_eq!(plan.inputs[0].path, "cover.png");
}

#[test]
fn timeline_of_only_empty_ranges_is_rejected() {
    let probe = FakeProbe::default().file("clip.mp4", 30, None);
    let mut splicer = Splicer::new(SpliceOptions::new("out.mov"), probe, DryRunMaterializer);
    let err = splicer
        .plan(Some("[v:clip.mp4] 5 5\n[a:clip.mp4] 0 0"))
        .unwrap_err();
    assert!(matches!(err, SpliceError::Configuration(_)), "{err}");
    assert!(err.to_string().contains("no segments left"), "{err}");
}

#[test]
fn interrupt_before_planning_skips_frame_materialization() {
    let flag = Arc::new(AtomicBool::new(true));
    let probe = FakeProbe::default().file("talk.mov", 60, Some((640, 480)));
    let mut splicer = Splicer::new(SpliceOptions::new("ep.mov"), probe, SizeRecorder::default())
        .with_interrupt(Arc::clone(&flag));

    let err = splicer
        .plan(Some("[v:talk.mov] 0 5\n[f:deck.pdf] 0 5"))
        .unwrap_err();
    assert!(
        matches!(&err, SpliceError::Interrupted { stage } if stage == "frame materialization"),
        "{err}"
    );
    assert!(splicer.materializer().sizes.is_empty());
    assert!(splicer.artifacts().paths().is_empty());
}

#[test]
fn interrupt_before_render_never_starts_ffmpeg() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("nested").join("ep.mov");
    let flag = Arc::new(AtomicBool::new(false));
    let probe = FakeProbe::default().file("talk.mov", 60, None);
    let mut splicer = Splicer::new(SpliceOptions::new(&output), probe, DryRunMaterializer)
        .with_interrupt(Arc::clone(&flag));

    let plan = splicer.plan(Some("[v:talk.mov] 0 5")).unwrap();
    flag.store(true, Ordering::SeqCst);

    let err = splicer.render(&plan).unwrap_err();
    assert!(
        matches!(&err, SpliceError::Interrupted { stage } if stage == "render"),
        "{err}"
    );
    assert!(!dir.path().join("nested").exists());
}
