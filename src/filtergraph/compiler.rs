use crate::chain::frames::ResolvedTimeline;
use crate::foundation::core::MediaKind;
use crate::foundation::error::SpliceResult;
use crate::timeline::registry::InputRegistry;
use crate::timeline::segment::Segment;

/// Audio loudness normalisation chained after the audio concat.
pub const NORMALISATION_FILTER: &str = "[aconc] dynaudnorm=r=0.25:f=10:b=y [anorm]";

/// Output-side options of the final render.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct RenderFlags {
    /// Downmix to mono (`-ac 1`).
    pub process_audio: bool,
    /// Convert to `yuv420p`.
    pub process_video: bool,
    /// Run the audio concat through [`NORMALISATION_FILTER`].
    pub normalise: bool,
    /// Audio encoder passed to `-codec:a`.
    pub audio_codec: String,
    /// Video encoder passed to `-codec:v`.
    pub video_codec: String,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self {
            process_audio: true,
            process_video: true,
            normalise: true,
            audio_codec: "pcm_s16le".to_owned(),
            video_codec: "h264".to_owned(),
        }
    }
}

/// A filter-graph program under construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct FilterGraph {
    filters: Vec<String>,
    has_audio: bool,
    has_video: bool,
}

impl FilterGraph {
    /// Empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one filter. Empty strings are ignored.
    pub fn append_filter(&mut self, filter: impl Into<String>) {
        let filter = filter.into();
        if !filter.is_empty() {
            self.filters.push(filter);
        }
    }

    /// One trim filter per audio/video segment; frames are skipped.
    pub fn append_trim_filters<'s>(
        &mut self,
        segments: impl IntoIterator<Item = &'s Segment>,
        registry: &InputRegistry,
    ) -> SpliceResult<()> {
        for seg in segments {
            if let Some(trim) = seg.trim_filter(registry)? {
                self.append_filter(trim);
            }
        }
        Ok(())
    }

    /// Join `segments` into `[aconc]` or `[vconc]`.
    ///
    /// Nothing for no segments, a `null`/`anull` pass-through for one (concat needs
    /// two inputs), `concat=n=N` otherwise. `MediaKind::Frame` never has a concat of
    /// its own: frames travel in the video concat.
    pub fn append_concat_filter(
        &mut self,
        kind: MediaKind,
        segments: &[&Segment],
        registry: &InputRegistry,
    ) -> SpliceResult<()> {
        let (letter, null) = match kind {
            MediaKind::Audio => ('a', "anull"),
            MediaKind::Video => ('v', "null"),
            MediaKind::Frame => return Ok(()),
        };
        let specs = segments
            .iter()
            .map(|s| s.output_stream_specifier(registry))
            .collect::<SpliceResult<Vec<_>>>()?;
        match specs.len() {
            0 => return Ok(()),
            1 => self.append_filter(format!("{} {null} [{letter}conc]", specs[0])),
            n => self.append_filter(format!(
                "{} concat=n={n}:v={}:a={} [{letter}conc]",
                specs.join(" "),
                u8::from(letter == 'v'),
                u8::from(letter == 'a'),
            )),
        }
        match kind {
            MediaKind::Audio => self.has_audio = true,
            _ => self.has_video = true,
        }
        Ok(())
    }

    /// Append [`NORMALISATION_FILTER`] if an audio concat is present.
    pub fn append_normalisation_filter(&mut self) {
        if self.has_audio {
            self.append_filter(NORMALISATION_FILTER);
        }
    }

    /// Whether an audio concat (`[aconc]`) was emitted.
    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    /// Whether a video concat (`[vconc]`) was emitted.
    pub fn has_video(&self) -> bool {
        self.has_video
    }

    /// Filters in emission order.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// The program text: filters joined with `;`.
    pub fn build(&self) -> String {
        self.filters.join(";")
    }
}

/// Compile a resolved timeline into its filter graph.
///
/// Order: trims, audio concat, normalisation, video concat.
#[tracing::instrument(level = "debug", skip_all, fields(segments = timeline.segments().len()))]
pub fn compile(
    timeline: &ResolvedTimeline,
    registry: &InputRegistry,
    flags: &RenderFlags,
) -> SpliceResult<FilterGraph> {
    let mut graph = FilterGraph::new();
    graph.append_trim_filters(timeline.segments(), registry)?;
    graph.append_concat_filter(MediaKind::Audio, &timeline.concat_inputs('a'), registry)?;
    if flags.normalise {
        graph.append_normalisation_filter();
    }
    graph.append_concat_filter(MediaKind::Video, &timeline.concat_inputs('v'), registry)?;
    tracing::debug!(filters = graph.filters.len(), "compiled filter graph");
    Ok(graph)
}

#[cfg(test)]
#[path = "../../tests/unit/filtergraph/compiler.rs"]
mod tests;
