use std::path::{Path, PathBuf};

use crate::foundation::core::MediaKind;

/// Names generated files `temp_<kind>_<output-stem>_<NNN>.<ext>` next to the output.
#[derive(Clone, Debug)]
pub struct TempNames {
    dir: PathBuf,
    stem: String,
}

impl TempNames {
    /// Names in `output`'s directory, derived from its file stem.
    pub fn for_output(output: &Path) -> Self {
        let dir = output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_owned());
        Self { dir, stem }
    }

    /// Artifact path for `segment` holding media of `kind`.
    pub fn path(&self, kind: MediaKind, segment: usize) -> PathBuf {
        self.dir.join(format!(
            "temp_{}_{}_{segment:03}.{}",
            kind.name(),
            self.stem,
            kind.temp_suffix()
        ))
    }
}

/// Generated files to delete once the final render has finished (or failed).
#[derive(Debug, Default)]
pub struct TempArtifacts {
    paths: Vec<PathBuf>,
}

impl TempArtifacts {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path` before anything is written to it, so partial output is removed too.
    pub fn push(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Recorded paths, oldest first.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete every recorded file. Files that are already gone are skipped.
    ///
    /// Returns the number of files removed.
    pub fn cleanup(&mut self) -> usize {
        let mut removed = 0;
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "removed temporary file");
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot remove temporary file");
                }
            }
        }
        removed
    }
}

#[cfg(test)]
#[path = "../../tests/unit/chain/temp.rs"]
mod tests;
