use std::collections::HashMap;

use crate::foundation::error::{SpliceError, SpliceResult};

/// One registered input file and the options placed ahead of its `-i`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct InputEntry {
    /// File passed to `-i`.
    pub path: String,
    /// Options placed before `-i`, such as still-image looping.
    pub options: Vec<String>,
}

/// Ordered set of input files. A file's position is its `-i` index in the final
/// invocation and therefore the `n` in every `[n:kind]` stream specifier.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct InputRegistry {
    entries: Vec<InputEntry>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl InputRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `path`, appending it on first sight.
    pub fn register(&mut self, path: &str) -> usize {
        if let Some(&i) = self.index.get(path) {
            return i;
        }
        let i = self.entries.len();
        self.entries.push(InputEntry {
            path: path.to_owned(),
            options: Vec::new(),
        });
        self.index.insert(path.to_owned(), i);
        tracing::trace!(path, index = i, "registered input");
        i
    }

    /// Register `path` and replace its invocation options.
    pub fn register_with_options(&mut self, path: &str, options: Vec<String>) -> usize {
        let i = self.register(path);
        self.entries[i].options = options;
        i
    }

    /// Substitute `new` for `old` in `old`'s slot, keeping its index.
    ///
    /// `options`, when given, replace the entry's options.
    pub fn rename(
        &mut self,
        old: &str,
        new: &str,
        options: Option<Vec<String>>,
    ) -> SpliceResult<usize> {
        let i = self.index_of(old).ok_or_else(|| {
            SpliceError::configuration(format!("cannot rename unregistered input '{old}'"))
        })?;
        if old != new {
            if self.index.contains_key(new) {
                return Err(SpliceError::configuration(format!(
                    "cannot rename '{old}' to '{new}': already registered"
                )));
            }
            self.index.remove(old);
            self.index.insert(new.to_owned(), i);
            self.entries[i].path = new.to_owned();
        }
        if let Some(options) = options {
            self.entries[i].options = options;
        }
        tracing::debug!(old, new, index = i, "renamed input");
        Ok(i)
    }

    /// Position of `path`, which is its `-i` index.
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    /// Invocation options currently attached to `path`.
    pub fn options_of(&self, path: &str) -> Option<&[String]> {
        self.index_of(path)
            .map(|i| self.entries[i].options.as_slice())
    }

    /// Entries in index order.
    pub fn entries(&self) -> &[InputEntry] {
        &self.entries
    }

    /// Number of registered inputs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/registry.rs"]
mod tests;
