use std::path::{Path, PathBuf};

use crate::chain::temp::{TempArtifacts, TempNames};
use crate::foundation::core::{FrameNumber, FrameSize, MediaKind};
use crate::foundation::error::{SpliceError, SpliceResult};
use crate::timeline::context::{CompilationContext, still_options};
use crate::timeline::resolve::Timeline;
use crate::timeline::segment::{FrameSource, FrameState, Segment, SegmentBody};

/// External producer of still images.
///
/// Every method writes exactly one file at `dest`.
pub trait FrameMaterializer {
    /// Copy `segment`'s punch range of its input into `dest`.
    fn render_segment(&mut self, segment: &Segment, dest: &Path) -> SpliceResult<()>;

    /// Write frame `frame` of `media` to `dest` as an image.
    fn extract_frame(&mut self, media: &Path, frame: FrameNumber, dest: &Path)
    -> SpliceResult<()>;

    /// Rasterize `page` of `document` into a `size` image at `dest`.
    fn rasterize_document(
        &mut self,
        document: &Path,
        page: FrameNumber,
        size: FrameSize,
        dest: &Path,
    ) -> SpliceResult<()>;
}

/// A timeline whose frame segments all have concrete images.
///
/// The filter-graph compiler only accepts this type.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ResolvedTimeline {
    segments: Vec<Segment>,
}

impl ResolvedTimeline {
    /// Accept `timeline` if no frame is waiting to be materialized.
    pub fn try_from_timeline(timeline: Timeline) -> SpliceResult<Self> {
        if let Some(seg) = timeline.segments.iter().find(|s| !s.is_resolved()) {
            return Err(SpliceError::chain(
                seg.number,
                "frame has not been materialized",
            ));
        }
        Ok(Self {
            segments: timeline.segments,
        })
    }

    /// Segments in number order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segments that feed the `kind` concat: audio, or video and frames.
    pub fn concat_inputs(&self, letter: char) -> Vec<&Segment> {
        self.segments
            .iter()
            .filter(|s| s.kind().stream_letter() == letter)
            .collect()
    }

    /// True when there is nothing to render.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Drives every frame segment from `Pending` to `Resolved`, in segment order.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameChain {
    size: FrameSize,
}

impl FrameChain {
    /// Chain rasterizing document pages at `size`.
    pub fn new(size: FrameSize) -> Self {
        Self { size }
    }

    /// Materialize every pending frame of `timeline`, recording generated files in
    /// `artifacts`. A failure names the frame segment it happened in.
    #[tracing::instrument(level = "debug", skip_all, fields(segments = timeline.segments.len()))]
    pub fn resolve(
        &self,
        mut timeline: Timeline,
        ctx: &mut CompilationContext,
        materializer: &mut dyn FrameMaterializer,
        names: &TempNames,
        artifacts: &mut TempArtifacts,
    ) -> SpliceResult<ResolvedTimeline> {
        // Broken links abort before any external work starts.
        for seg in &timeline.segments {
            if pending_source(seg) == Some(&FrameSource::PreviousSegment) {
                predecessor(&timeline.segments, seg)?;
            }
        }

        for pos in 0..timeline.segments.len() {
            let Some(source) = pending_source(&timeline.segments[pos]).cloned() else {
                continue;
            };
            let number = timeline.segments[pos].number;
            set_state(
                &mut timeline.segments[pos],
                FrameState::Materializing(source.clone()),
            );

            let image = names.path(MediaKind::Frame, number);
            match &source {
                FrameSource::PreviousSegment => {
                    let prev = predecessor(&timeline.segments, &timeline.segments[pos])?.clone();
                    let frame = frame_number(&timeline.segments[pos]);
                    let media = names.path(prev.kind(), prev.number);
                    tracing::info!(
                        segment = number,
                        from = prev.number,
                        frame = %frame,
                        "extracting frame from previous segment"
                    );
                    artifacts.push(media.clone());
                    materializer
                        .render_segment(&prev, &media)
                        .map_err(|e| SpliceError::chain(number, e.to_string()))?;
                    artifacts.push(image.clone());
                    materializer
                        .extract_frame(&media, frame, &image)
                        .map_err(|e| SpliceError::chain(number, e.to_string()))?;
                }
                FrameSource::Document { path, page } => {
                    tracing::info!(segment = number, document = %path, page = %page, "rasterizing page");
                    artifacts.push(image.clone());
                    materializer
                        .rasterize_document(Path::new(path), *page, self.size, &image)
                        .map_err(|e| SpliceError::chain(number, e.to_string()))?;
                }
            }

            let seg = &mut timeline.segments[pos];
            let image = path_string(image);
            ctx.registry_mut()
                .rename(&seg.input, &image, Some(still_options(seg.duration())))?;
            seg.input = image.clone();
            set_state(seg, FrameState::Resolved { image });
        }

        ResolvedTimeline::try_from_timeline(timeline)
    }
}

fn pending_source(seg: &Segment) -> Option<&FrameSource> {
    match seg.frame().map(|f| &f.state) {
        Some(FrameState::Pending(source)) => Some(source),
        _ => None,
    }
}

fn frame_number(seg: &Segment) -> FrameNumber {
    seg.frame().map_or(FrameNumber::Last, |f| f.frame)
}

fn set_state(seg: &mut Segment, state: FrameState) {
    if let SegmentBody::Frame(frame) = &mut seg.body {
        frame.state = state;
    }
}

/// The segment numbered immediately before `seg`, which must be a video segment.
fn predecessor<'t>(segments: &'t [Segment], seg: &Segment) -> SpliceResult<&'t Segment> {
    let missing = || {
        SpliceError::chain(
            seg.number,
            "'^' refers to the previous segment, but there is none",
        )
    };
    let wanted = seg.number.checked_sub(1).ok_or_else(missing)?;
    let prev = segments
        .iter()
        .find(|s| s.number == wanted)
        .ok_or_else(missing)?;
    if prev.kind() != MediaKind::Video {
        return Err(SpliceError::chain(
            seg.number,
            format!(
                "'^' refers to segment {}, which is {} rather than video",
                prev.number,
                prev.kind()
            ),
        ));
    }
    Ok(prev)
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[path = "../../tests/unit/chain/frames.rs"]
mod tests;
