use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// One file to materialize: a slash-separated path relative to the target
/// root and the text to write there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub contents: String,
}

impl ManifestEntry {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// The entry path checked against [`safe_relative_path`].
    pub fn relative_path(&self) -> Result<PathBuf> {
        safe_relative_path(&self.path)
    }
}

/// Validate a manifest path and convert it to a relative [`PathBuf`].
///
/// Rejects absolute paths, drive prefixes and any `..` segment with
/// [`PipelineError::PathTraversal`]; rejects paths that name nothing (empty,
/// `.`, `./`) with [`PipelineError::InvalidManifest`]. `.` segments and
/// repeated slashes are dropped.
pub fn safe_relative_path(raw: &str) -> Result<PathBuf> {
    if raw.contains('\0') {
        return Err(PipelineError::InvalidManifest(format!(
            "path contains a NUL byte: {raw:?}"
        )));
    }

    let mut normalized = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PipelineError::PathTraversal {
                    path: raw.to_string(),
                });
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(PipelineError::InvalidManifest(format!(
            "path does not name a file: {raw:?}"
        )));
    }
    Ok(normalized)
}

/// Validate a single tree node name: one normal path segment.
///
/// A backslash is a separator only on Windows; elsewhere it is an ordinary
/// file name character.
pub fn safe_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && (cfg!(not(windows)) || !name.contains('\\'))
        && !name.contains('\0')
}
