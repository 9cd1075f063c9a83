//! Source text handed to [`crate::Context::eval`].

use std::path::{Path, PathBuf};

/// Borrowed or owned script source, optionally tagged with a path used to
/// key the [`crate::debugger::script_registry::ScriptRegistry`].
#[derive(Debug, Clone)]
pub struct Source {
    text: String,
    path: Option<PathBuf>,
}

impl Source {
    /// Build a source from raw bytes/text with no associated path.
    pub fn from_bytes(src: impl AsRef<str>) -> Self {
        Self {
            text: src.as_ref().to_string(),
            path: None,
        }
    }

    /// Build a source tagged with the filesystem path it was read from.
    pub fn from_filepath(path: impl AsRef<Path>, src: impl AsRef<str>) -> Self {
        Self {
            text: src.as_ref().to_string(),
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// The raw source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The path this source was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
