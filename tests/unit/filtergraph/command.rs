use std::path::Path;

use super::*;
use crate::chain::frames::ResolvedTimeline;
use crate::config::parser::parse_config;
use crate::filtergraph::compiler::compile;
use crate::foundation::core::Timecode;
use crate::foundation::error::SpliceResult;
use crate::timeline::context::CompilationContext;
use crate::timeline::resolve::{DurationProbe, Resolver, StreamDefaults};

struct TenSeconds;

impl DurationProbe for TenSeconds {
    fn exists(&self, _path: &Path) -> bool {
        true
    }

    fn duration(&mut self, _path: &Path) -> SpliceResult<Timecode> {
        Ok(Timecode::from_secs(10))
    }
}

fn command(src: &str, flags: &RenderFlags) -> ConcatCommand {
    let mut ctx = CompilationContext::new();
    let specs = parse_config(src).unwrap();
    let defaults = StreamDefaults::default();
    let timeline = Resolver::new(&defaults, &mut TenSeconds)
        .resolve(&specs, &mut ctx)
        .unwrap();
    let timeline = ResolvedTimeline::try_from_timeline(timeline).unwrap();
    let graph = compile(&timeline, ctx.registry(), flags).unwrap();
    ConcatCommand::new(&graph, ctx.registry(), flags, Path::new("out.mov"))
}

#[test]
fn argument_order_with_audio_video_and_still() {
    let cmd = command(
        "[a:talk.wav]\n[f:title.png] 0 4\n[v:talk.mov] 0 6",
        &RenderFlags::default(),
    );
    let args = cmd.args();
    let expected = [
        "-y",
        "-nostdin",
        "-i",
        "talk.wav",
        "-loop",
        "1",
        "-t",
        "4",
        "-i",
        "title.png",
        "-i",
        "talk.mov",
        "-filter_complex",
        cmd.program(),
        "-codec:a",
        "pcm_s16le",
        "-ac",
        "1",
        "-map",
        "[anorm]",
        "-codec:v",
        "h264",
        "-pix_fmt",
        "yuv420p",
        "-map",
        "[vconc]",
        "out.mov",
    ];
    assert_eq!(args, expected);
}

#[test]
fn flags_change_output_options() {
    let flags = RenderFlags {
        process_audio: false,
        process_video: false,
        normalise: false,
        audio_codec: "aac".to_owned(),
        video_codec: "libx264".to_owned(),
    };
    let args = command("[a:talk.wav:v:talk.mov] 0 5", &flags).args();
    let tail: Vec<_> = args
        .iter()
        .skip_while(|a| *a != "-codec:a")
        .map(String::as_str)
        .collect();
    assert_eq!(
        tail,
        [
            "-codec:a", "aac", "-map", "[aconc]", "-codec:v", "libx264", "-map", "[vconc]",
            "out.mov"
        ]
    );
}

#[test]
fn absent_kind_has_no_mapping() {
    let args = command("[a:talk.wav] 0 5", &RenderFlags::default()).args();
    assert!(!args.iter().any(|a| a == "[vconc]" || a == "-codec:v"));
    assert!(args.iter().any(|a| a == "[anorm]"));
}

#[test]
fn display_string_round_trips_through_a_shell() {
    let cmd = command("[v:my talk.mov] 0 5", &RenderFlags::default());
    let shown = cmd.display_string();
    assert!(shown.starts_with("ffmpeg -y -nostdin -i "), "{shown}");
    let words = shlex::split(&shown).unwrap();
    assert_eq!(words[0], "ffmpeg");
    assert_eq!(words[1..].to_vec(), cmd.args());
}
