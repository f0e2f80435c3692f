use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::chain::frames::{FrameChain, FrameMaterializer, ResolvedTimeline};
use crate::chain::temp::{TempArtifacts, TempNames};
use crate::config::parser::parse_config;
use crate::filtergraph::command::ConcatCommand;
use crate::filtergraph::compiler::{RenderFlags, compile};
use crate::foundation::core::{FrameNumber, FrameSize, MediaKind};
use crate::foundation::error::{SpliceError, SpliceResult};
use crate::media::run::{ensure_parent_dir, run_command};
use crate::timeline::context::CompilationContext;
use crate::timeline::registry::InputEntry;
use crate::timeline::resolve::{DurationProbe, Resolver, StreamDefaults, Timeline};
use crate::timeline::segment::{FrameSource, FrameState, Segment};

/// Everything a splice run needs besides its collaborators.
#[derive(Clone, Debug)]
pub struct SpliceOptions {
    /// Final output file; temporary files go next to it.
    pub output: PathBuf,
    /// Files and streams used when a spec leaves them out.
    pub defaults: StreamDefaults,
    /// Output options of the final render.
    pub flags: RenderFlags,
    /// Rasterization size for document pages. Probed from the first video input when unset.
    pub frame_size: Option<FrameSize>,
    /// Leave generated temporary files in place.
    pub keep_temp_files: bool,
}

impl SpliceOptions {
    /// Options with default flags and no stream defaults.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            defaults: StreamDefaults::default(),
            flags: RenderFlags::default(),
            frame_size: None,
            keep_temp_files: false,
        }
    }
}

/// A compiled run: what will be rendered and how.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RenderPlan {
    /// Segments with every frame materialized.
    pub timeline: ResolvedTimeline,
    /// Registered inputs in `-i` order.
    pub inputs: Vec<InputEntry>,
    /// The compiled filter-graph program.
    pub filter_graph: String,
    /// The ffmpeg invocation rendering it.
    pub command: ConcatCommand,
}

/// Configuration text in, rendered podcast out.
pub struct Splicer<P, M> {
    options: SpliceOptions,
    ctx: CompilationContext,
    probe: P,
    materializer: M,
    artifacts: TempArtifacts,
    interrupt: Option<Arc<AtomicBool>>,
}

impl<P: DurationProbe, M: FrameMaterializer> Splicer<P, M> {
    /// Splicer with a fresh compilation context.
    pub fn new(options: SpliceOptions, probe: P, materializer: M) -> Self {
        Self {
            options,
            ctx: CompilationContext::new(),
            probe,
            materializer,
            artifacts: TempArtifacts::new(),
            interrupt: None,
        }
    }

    /// Stop before the next external stage once `flag` is set.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn check_interrupt(&self, stage: &str) -> SpliceResult<()> {
        match &self.interrupt {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(SpliceError::Interrupted {
                stage: stage.to_owned(),
            }),
            _ => Ok(()),
        }
    }

    /// Options this splicer was built with.
    pub fn options(&self) -> &SpliceOptions {
        &self.options
    }

    /// Duration source.
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Frame producer.
    pub fn materializer(&self) -> &M {
        &self.materializer
    }

    /// Temporary files generated so far.
    pub fn artifacts(&self) -> &TempArtifacts {
        &self.artifacts
    }

    /// Parse, resolve, materialize frames and compile.
    ///
    /// With no configuration, or one without segment specs, each default audio,
    /// video and frame file is used whole. An empty resolved timeline is rejected.
    #[tracing::instrument(level = "info", skip_all, fields(output = %self.options.output.display()))]
    pub fn plan(&mut self, config: Option<&str>) -> SpliceResult<RenderPlan> {
        self.ctx.reset();

        let mut specs = match config {
            Some(src) => parse_config(src)?,
            None => Vec::new(),
        };
        if specs.is_empty() {
            specs = self.options.defaults.whole_file_specs();
            if specs.is_empty() {
                return Err(SpliceError::configuration(
                    "must specify at least one input",
                ));
            }
            tracing::info!(
                inputs = specs.len(),
                "no segments configured, using default streams whole"
            );
        }

        let timeline = Resolver::new(&self.options.defaults, &mut self.probe)
            .resolve(&specs, &mut self.ctx)?;
        tracing::info!(segments = timeline.segments.len(), "resolved timeline");
        if timeline.is_empty() {
            return Err(SpliceError::configuration(
                "no segments left to render: every punch range was zero-length",
            ));
        }

        self.check_interrupt("frame materialization")?;
        let size = self.frame_size(&timeline)?;
        let names = TempNames::for_output(&self.options.output);
        let resolved = FrameChain::new(size).resolve(
            timeline,
            &mut self.ctx,
            &mut self.materializer,
            &names,
            &mut self.artifacts,
        )?;

        let graph = compile(&resolved, self.ctx.registry(), &self.options.flags)?;
        let command = ConcatCommand::new(
            &graph,
            self.ctx.registry(),
            &self.options.flags,
            &self.options.output,
        );
        tracing::debug!(program = %graph.build(), "filter graph");

        Ok(RenderPlan {
            timeline: resolved,
            inputs: self.ctx.registry().entries().to_vec(),
            filter_graph: graph.build(),
            command,
        })
    }

    /// Run the final ffmpeg invocation.
    pub fn render(&mut self, plan: &RenderPlan) -> SpliceResult<()> {
        self.check_interrupt("render")?;
        ensure_parent_dir(plan.command.output())?;
        tracing::info!(output = %plan.command.output().display(), "concatenating final podcast");
        run_command(&plan.command)
    }

    /// Delete generated files unless they are to be kept. Returns how many were removed.
    pub fn cleanup(&mut self) -> usize {
        if self.options.keep_temp_files {
            tracing::info!(files = self.artifacts.paths().len(), "keeping temporary files");
            return 0;
        }
        tracing::info!("cleaning up");
        self.artifacts.cleanup()
    }

    /// Rasterization size: the configured one, else the first probed video input.
    fn frame_size(&mut self, timeline: &Timeline) -> SpliceResult<FrameSize> {
        if let Some(size) = self.options.frame_size {
            return Ok(size);
        }
        if !timeline.segments.iter().any(needs_rasterizing) {
            return Ok(FrameSize::default());
        }
        for seg in timeline.segments.iter().filter(|s| s.kind() == MediaKind::Video) {
            let path = Path::new(&seg.input);
            if self.probe.exists(path)
                && let Some(size) = self.probe.video_size(path)?
            {
                tracing::debug!(%size, from = %seg.input, "frame size");
                return Ok(size);
            }
        }
        Ok(FrameSize::default())
    }
}

fn needs_rasterizing(seg: &Segment) -> bool {
    matches!(
        seg.frame().map(|f| &f.state),
        Some(FrameState::Pending(FrameSource::Document { .. }))
    )
}

/// Materializer for `--dry-run`: names every artifact but produces nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunMaterializer;

impl FrameMaterializer for DryRunMaterializer {
    fn render_segment(&mut self, segment: &Segment, dest: &Path) -> SpliceResult<()> {
        tracing::info!(segment = segment.number, dest = %dest.display(), "would render segment");
        Ok(())
    }

    fn extract_frame(
        &mut self,
        media: &Path,
        frame: FrameNumber,
        dest: &Path,
    ) -> SpliceResult<()> {
        tracing::info!(media = %media.display(), %frame, dest = %dest.display(), "would extract frame");
        Ok(())
    }

    fn rasterize_document(
        &mut self,
        document: &Path,
        page: FrameNumber,
        size: FrameSize,
        dest: &Path,
    ) -> SpliceResult<()> {
        tracing::info!(
            document = %document.display(),
            %page,
            %size,
            dest = %dest.display(),
            "would rasterize page"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
