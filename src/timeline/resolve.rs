use std::path::Path;

use crate::config::ast::{InputSpec, SourceRef, TimeToken};
use crate::foundation::core::{FrameNumber, FrameSize, MediaKind, Timecode};
use crate::foundation::error::{SpliceError, SpliceResult};
use crate::timeline::context::{CompilationContext, pending_key};
use crate::timeline::segment::{FrameSegment, FrameSource, FrameState, Segment, SegmentBody};

/// Default file and stream for one media kind, used when an input spec omits them.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct StreamDefault {
    /// File used when a spec names none.
    pub file: Option<String>,
    /// Stream (or frame) index used when a spec gives none.
    pub stream: Option<u32>,
}

/// Per-kind defaults, normally filled from `--audio`, `--video` and `--frame`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct StreamDefaults {
    /// `--audio` and `--audio-stream`.
    pub audio: StreamDefault,
    /// `--video` and `--video-stream`.
    pub video: StreamDefault,
    /// `--frame`.
    pub frame: StreamDefault,
}

impl StreamDefaults {
    /// Defaults for `kind`.
    pub fn get(&self, kind: MediaKind) -> &StreamDefault {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
            MediaKind::Frame => &self.frame,
        }
    }

    /// Whole-stream specs for every default file: audio, video, then frame.
    pub fn whole_file_specs(&self) -> Vec<InputSpec> {
        [MediaKind::Audio, MediaKind::Video, MediaKind::Frame]
            .into_iter()
            .filter_map(|kind| {
                let d = self.get(kind);
                d.file
                    .as_ref()
                    .map(|f| InputSpec::whole(kind, f.clone(), d.stream.unwrap_or(0)))
            })
            .collect()
    }
}

/// Source of media durations.
pub trait DurationProbe {
    /// Whether `path` can be probed at all.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Duration of the file's container, millisecond precision.
    fn duration(&mut self, path: &Path) -> SpliceResult<Timecode>;

    /// Picture size of the file's first video stream, when known.
    fn video_size(&mut self, _path: &Path) -> SpliceResult<Option<FrameSize>> {
        Ok(None)
    }
}

/// Resolver output: segments in creation order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Timeline {
    /// Segments in number order.
    pub segments: Vec<Segment>,
}

impl Timeline {
    /// Summed segment durations for one kind.
    pub fn total_duration(&self, kind: MediaKind) -> Timecode {
        self.segments
            .iter()
            .filter(|s| s.kind() == kind)
            .fold(Timecode::ZERO, |acc, s| acc.saturating_add(s.duration()))
    }

    /// Everything that ends up in the video concat: video and frame segments.
    pub fn total_picture_duration(&self) -> Timecode {
        self.total_duration(MediaKind::Video)
            .saturating_add(self.total_duration(MediaKind::Frame))
    }

    /// True when no segment survived resolution.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Turns input specs into numbered segments.
pub struct Resolver<'a> {
    defaults: &'a StreamDefaults,
    probe: &'a mut dyn DurationProbe,
}

impl<'a> Resolver<'a> {
    /// Resolver filling gaps from `defaults` and durations from `probe`.
    pub fn new(defaults: &'a StreamDefaults, probe: &'a mut dyn DurationProbe) -> Self {
        Self { defaults, probe }
    }

    /// Resolve `specs` in order, numbering segments and registering inputs in `ctx`.
    #[tracing::instrument(level = "debug", skip_all, fields(specs = specs.len()))]
    pub fn resolve(
        &mut self,
        specs: &[InputSpec],
        ctx: &mut CompilationContext,
    ) -> SpliceResult<Timeline> {
        let mut timeline = Timeline::default();
        for spec in specs {
            self.resolve_spec(spec, ctx, &mut timeline.segments)?;
        }

        let audio = timeline.total_duration(MediaKind::Audio);
        let picture = timeline.total_picture_duration();
        if audio != picture && audio > Timecode::ZERO && picture > Timecode::ZERO {
            tracing::warn!(
                audio = %audio,
                video = %picture,
                "total audio and video durations differ"
            );
        }
        Ok(timeline)
    }

    fn resolve_spec(
        &mut self,
        spec: &InputSpec,
        ctx: &mut CompilationContext,
        out: &mut Vec<Segment>,
    ) -> SpliceResult<()> {
        let default = self.defaults.get(spec.kind);
        let source = match (&spec.filename, &default.file) {
            (Some(src), _) => src.clone(),
            (None, Some(file)) => SourceRef::File(file.clone()),
            (None, None) => {
                return Err(SpliceError::configuration(format!(
                    "segment {number}: attempting to use default {kind} input, but --{kind} hasn't been specified",
                    number = ctx.next_segment_number(),
                    kind = spec.kind
                )));
            }
        };
        let index = spec
            .index
            .or(default.stream.map(FrameNumber::Index))
            .unwrap_or(FrameNumber::Index(0));

        let stream_duration = match (&source, spec.kind) {
            (SourceRef::File(path), MediaKind::Audio | MediaKind::Video)
                if self.probe.exists(Path::new(path)) =>
            {
                self.probe.duration(Path::new(path))?
            }
            _ => Timecode::ZERO,
        };

        if spec.times.is_empty() {
            if stream_duration == Timecode::ZERO {
                tracing::warn!(
                    segment = ctx.next_segment_number(),
                    kind = %spec.kind,
                    "whole-stream segment has zero length"
                );
            }
            out.push(build_segment(
                ctx,
                spec.kind,
                &source,
                index,
                Timecode::ZERO,
                stream_duration,
            )?);
            return Ok(());
        }

        let mut pairs = spec.times.chunks_exact(2);
        for pair in &mut pairs {
            let punch_in = absolute(&pair[0])?;
            let punch_out = match &pair[1] {
                TimeToken::Timestamp(t) => t.to_timecode()?,
                TimeToken::DurationReference { filename } => {
                    punch_in.saturating_add(self.referenced_duration(filename, ctx)?)
                }
            };
            if let Some(seg) = accept(ctx, spec.kind, &source, index, punch_in, punch_out)? {
                out.push(seg);
            }
        }
        // An unpaired trailing timestamp runs to the end of the source.
        if let [tail] = pairs.remainder() {
            let punch_in = absolute(tail)?;
            if let Some(seg) = accept(ctx, spec.kind, &source, index, punch_in, stream_duration)? {
                out.push(seg);
            }
        }
        Ok(())
    }

    fn referenced_duration(
        &mut self,
        filename: &str,
        ctx: &CompilationContext,
    ) -> SpliceResult<Timecode> {
        let number = ctx.next_segment_number();
        let path = Path::new(filename);
        if !self.probe.exists(path) {
            return Err(SpliceError::configuration(format!(
                "segment {number}: duration reference target '@{filename}' does not exist"
            )));
        }
        self.probe.duration(path).map_err(|e| {
            SpliceError::configuration(format!(
                "segment {number}: cannot read duration of '@{filename}': {e}"
            ))
        })
    }
}

fn absolute(token: &TimeToken) -> SpliceResult<Timecode> {
    match token {
        TimeToken::Timestamp(t) => t.to_timecode(),
        TimeToken::DurationReference { filename } => Err(SpliceError::configuration(format!(
            "unreadable timestamp: duration reference '@{filename}' used as a punch-in point"
        ))),
    }
}

/// Validate a punch range and build its segment. Equal points drop the range.
fn accept(
    ctx: &mut CompilationContext,
    kind: MediaKind,
    source: &SourceRef,
    index: FrameNumber,
    punch_in: Timecode,
    punch_out: Timecode,
) -> SpliceResult<Option<Segment>> {
    match punch_out.cmp(&punch_in) {
        std::cmp::Ordering::Less => Err(SpliceError::timeline(
            ctx.next_segment_number(),
            format!("punch-out {punch_out} precedes punch-in {punch_in}"),
        )),
        std::cmp::Ordering::Equal => {
            tracing::warn!(
                segment = ctx.next_segment_number(),
                kind = %kind,
                at = %punch_in,
                "dropping zero-length segment"
            );
            Ok(None)
        }
        std::cmp::Ordering::Greater => {
            build_segment(ctx, kind, source, index, punch_in, punch_out).map(Some)
        }
    }
}

fn build_segment(
    ctx: &mut CompilationContext,
    kind: MediaKind,
    source: &SourceRef,
    index: FrameNumber,
    punch_in: Timecode,
    punch_out: Timecode,
) -> SpliceResult<Segment> {
    let number = ctx.next_segment_number();
    let stream = || match index {
        FrameNumber::Index(n) => Ok(n),
        FrameNumber::Last => Err(SpliceError::configuration(format!(
            "{kind} input of segment {number} cannot select the last frame"
        ))),
    };

    let (input, body) = match (kind, source) {
        (MediaKind::Audio, SourceRef::File(path)) => {
            (path.clone(), SegmentBody::Audio { stream: stream()? })
        }
        (MediaKind::Video, SourceRef::File(path)) => {
            (path.clone(), SegmentBody::Video { stream: stream()? })
        }
        (MediaKind::Audio | MediaKind::Video, SourceRef::PreviousSegment) => {
            return Err(SpliceError::configuration(format!(
                "'^' is only valid for frame inputs (segment {number})"
            )));
        }
        (MediaKind::Frame, SourceRef::PreviousSegment) => (
            pending_key("^", number),
            SegmentBody::Frame(FrameSegment {
                frame: index,
                state: FrameState::Pending(FrameSource::PreviousSegment),
            }),
        ),
        (MediaKind::Frame, SourceRef::File(path)) => match FrameSource::for_file(path, index) {
            Some(document) => (
                pending_key(path, number),
                SegmentBody::Frame(FrameSegment {
                    frame: index,
                    state: FrameState::Pending(document),
                }),
            ),
            None => (
                path.clone(),
                SegmentBody::Frame(FrameSegment {
                    frame: index,
                    state: FrameState::Resolved {
                        image: path.clone(),
                    },
                }),
            ),
        },
    };
    Ok(ctx.create_segment(punch_in, punch_out, input, body))
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/resolve.rs"]
mod tests;
