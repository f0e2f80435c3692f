use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use podsplice::{
    DryRunMaterializer, FfmpegMaterializer, FfprobeProbe, FrameMaterializer, FrameSize,
    RenderFlags, SpliceOptions, Splicer, StreamDefault, StreamDefaults,
};

/// Assemble a podcast from punched-in audio, video and still-frame segments.
#[derive(Parser, Debug)]
#[command(name = "podsplice", version)]
struct Cli {
    /// Output file.
    output: PathBuf,

    /// Default audio input.
    #[arg(short = 'a', long, value_name = "FILE")]
    audio: Option<String>,

    /// Default audio stream index.
    #[arg(long, value_name = "N")]
    audio_stream: Option<u32>,

    /// Default video input.
    #[arg(short = 'v', long, value_name = "FILE")]
    video: Option<String>,

    /// Default video stream index.
    #[arg(long, value_name = "N")]
    video_stream: Option<u32>,

    /// Default still-frame input.
    #[arg(short = 'f', long, value_name = "FILE")]
    frame: Option<String>,

    /// Segment configuration file.
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Size used when rasterizing document pages, e.g. `1920x1080`.
    #[arg(long, value_name = "WxH", value_parser = parse_frame_size)]
    frame_size: Option<FrameSize>,

    /// Verbose logging. Wins over `--quiet`.
    #[arg(short = 'd', long)]
    debug: bool,

    /// Only log warnings and errors.
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Keep temporary files.
    #[arg(short = 'k', long)]
    keep: bool,

    /// Skip loudness normalisation of the audio.
    #[arg(long)]
    no_normalise: bool,

    /// Keep the audio channel layout instead of downmixing to mono.
    #[arg(long)]
    no_process_audio: bool,

    /// Keep the source pixel format instead of converting to yuv420p.
    #[arg(long)]
    no_process_video: bool,

    #[arg(long, value_name = "CODEC", default_value = "pcm_s16le")]
    audio_codec: String,

    #[arg(long, value_name = "CODEC", default_value = "h264")]
    video_codec: String,

    /// Print the ffmpeg command instead of running it. No temporary files are made.
    #[arg(long)]
    dry_run: bool,

    /// Print the compiled plan as JSON.
    #[arg(long)]
    dump_plan: bool,
}

impl Cli {
    fn options(&self) -> SpliceOptions {
        let mut options = SpliceOptions::new(&self.output);
        options.defaults = StreamDefaults {
            audio: StreamDefault {
                file: self.audio.clone(),
                stream: self.audio_stream,
            },
            video: StreamDefault {
                file: self.video.clone(),
                stream: self.video_stream,
            },
            frame: StreamDefault {
                file: self.frame.clone(),
                stream: None,
            },
        };
        options.flags = RenderFlags {
            process_audio: !self.no_process_audio,
            process_video: !self.no_process_video,
            normalise: !self.no_normalise,
            audio_codec: self.audio_codec.clone(),
            video_codec: self.video_codec.clone(),
        };
        options.frame_size = self.frame_size;
        options.keep_temp_files = self.keep;
        options
    }

    fn log_filter(&self) -> EnvFilter {
        let level = if self.debug {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}

fn parse_frame_size(s: &str) -> Result<FrameSize, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let dim = |v: &str| {
        v.trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("invalid dimension '{v}' in '{s}'"))
    };
    Ok(FrameSize {
        width: dim(w)?,
        height: dim(h)?,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter())
        .with_writer(std::io::stderr)
        .init();

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupted);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::warn!(error = %e, "cannot install interrupt handler");
        }
    }

    let result = if cli.dry_run {
        let mut splicer = Splicer::new(cli.options(), FfprobeProbe::new(), DryRunMaterializer);
        execute(&cli, &mut splicer)
    } else {
        let mut splicer = Splicer::new(
            cli.options(),
            FfprobeProbe::new(),
            FfmpegMaterializer::new(),
        )
        .with_interrupt(Arc::clone(&interrupted));
        let result = execute(&cli, &mut splicer);
        let removed = splicer.cleanup();
        tracing::debug!(removed, "temporary files removed");
        result
    };

    if interrupted.load(Ordering::SeqCst) {
        tracing::error!("interrupted");
        return ExitCode::FAILURE;
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn execute<M: FrameMaterializer>(
    cli: &Cli,
    splicer: &mut Splicer<FfprobeProbe, M>,
) -> anyhow::Result<()> {
    let config = cli
        .config
        .as_ref()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("read configuration '{}'", path.display()))
        })
        .transpose()?;

    let plan = splicer.plan(config.as_deref())?;

    if cli.dump_plan {
        println!(
            "{}",
            serde_json::to_string_pretty(&plan).context("serialize plan")?
        );
    }
    if cli.dry_run {
        println!("{}", plan.command.display_string());
        return Ok(());
    }

    splicer.render(&plan)?;
    eprintln!("wrote {}", plan.command.output().display());
    Ok(())
}
