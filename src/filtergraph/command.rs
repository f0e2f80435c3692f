use std::path::{Path, PathBuf};

use crate::filtergraph::compiler::{FilterGraph, RenderFlags};
use crate::timeline::registry::{InputEntry, InputRegistry};

/// The final `ffmpeg` invocation that renders a compiled filter graph.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ConcatCommand {
    inputs: Vec<InputEntry>,
    program: String,
    has_audio: bool,
    has_video: bool,
    flags: RenderFlags,
    output: PathBuf,
}

impl ConcatCommand {
    /// Invocation rendering `graph` over `registry`'s inputs into `output`.
    pub fn new(
        graph: &FilterGraph,
        registry: &InputRegistry,
        flags: &RenderFlags,
        output: &Path,
    ) -> Self {
        Self {
            inputs: registry.entries().to_vec(),
            program: graph.build(),
            has_audio: graph.has_audio(),
            has_video: graph.has_video(),
            flags: flags.clone(),
            output: output.to_path_buf(),
        }
    }

    /// The `-filter_complex` program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Output file.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Arguments after the executable name.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_owned(), "-nostdin".to_owned()];
        for input in &self.inputs {
            args.extend(input.options.iter().cloned());
            args.push("-i".to_owned());
            args.push(input.path.clone());
        }
        args.push("-filter_complex".to_owned());
        args.push(self.program.clone());

        if self.has_audio {
            args.extend(["-codec:a".to_owned(), self.flags.audio_codec.clone()]);
            if self.flags.process_audio {
                args.extend(["-ac".to_owned(), "1".to_owned()]);
            }
            let label = if self.flags.normalise {
                "[anorm]"
            } else {
                "[aconc]"
            };
            args.extend(["-map".to_owned(), label.to_owned()]);
        }
        if self.has_video {
            args.extend(["-codec:v".to_owned(), self.flags.video_codec.clone()]);
            if self.flags.process_video {
                args.extend(["-pix_fmt".to_owned(), "yuv420p".to_owned()]);
            }
            args.extend(["-map".to_owned(), "[vconc]".to_owned()]);
        }
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Copy-pasteable shell form, `ffmpeg` included.
    pub fn display_string(&self) -> String {
        let args = self.args();
        let words = std::iter::once("ffmpeg").chain(args.iter().map(String::as_str));
        shlex::try_join(words).unwrap_or_else(|_| format!("ffmpeg {}", args.join(" ")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filtergraph/command.rs"]
mod tests;
