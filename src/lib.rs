//! podsplice assembles a podcast or lecture recording from punched-in segments of
//! audio, video and still-frame inputs.
//!
//! A run goes through four stages:
//!
//! - parse segment configuration text into [`InputSpec`]s
//! - resolve them into numbered [`Segment`]s on a [`Timeline`], registering inputs
//! - materialize still frames (`^` and document pages) into a [`ResolvedTimeline`]
//! - compile the timeline into one ffmpeg filter-graph program and [`ConcatCommand`]
//!
//! [`Splicer`] drives all of them; the stage types are public for callers that need
//! only part of the pipeline.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod chain;
mod config;
mod filtergraph;
mod foundation;
mod media;
mod timeline;

/// End-to-end orchestration.
pub mod pipeline;

pub use crate::foundation::core::{FrameNumber, FrameSize, MediaKind, Timecode};
pub use crate::foundation::error::{SpliceError, SpliceResult};

pub use crate::config::ast::{ClockTime, InputSpec, SourceRef, TimeToken};
pub use crate::config::parser::{parse_config, parse_config_file};

pub use crate::timeline::context::CompilationContext;
pub use crate::timeline::registry::{InputEntry, InputRegistry};
pub use crate::timeline::resolve::{
    DurationProbe, Resolver, StreamDefault, StreamDefaults, Timeline,
};
pub use crate::timeline::segment::{FrameSegment, FrameSource, FrameState, Segment, SegmentBody};

pub use crate::chain::frames::{FrameChain, FrameMaterializer, ResolvedTimeline};
pub use crate::chain::temp::{TempArtifacts, TempNames};

pub use crate::filtergraph::command::ConcatCommand;
pub use crate::filtergraph::compiler::{FilterGraph, NORMALISATION_FILTER, RenderFlags, compile};

pub use crate::media::materialize::FfmpegMaterializer;
pub use crate::media::probe::{FfprobeProbe, MediaInfo, parse_probe_output};
pub use crate::media::run::{is_tool_on_path, locate, run_command};

pub use crate::pipeline::{DryRunMaterializer, RenderPlan, SpliceOptions, Splicer};
