//! Error taxonomy shared by every pipeline stage.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::service::ServiceError;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Pipeline errors.
///
/// Manifest parse failures never show up here: the normalizer recovers from
/// them locally with its fallback manifest.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("schema violation at {path}: {reason}")]
    SchemaViolation { path: String, reason: String },

    #[error("unsafe path rejected: {path}")]
    PathTraversal { path: String },

    #[error("template not found or not a directory: {}", path.display())]
    TemplateNotFound { path: PathBuf },

    #[error("I/O failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("generation {generation} of project '{project}' was claimed by another writer")]
    VersionAllocationConflict { project: String, generation: u32 },

    #[error("invalid project name: '{0}'")]
    InvalidProjectName(String),

    #[error("depth limit of {limit} exceeded at {}", path.display())]
    DepthLimitExceeded { path: PathBuf, limit: usize },

    #[error("generation service error: {0}")]
    Service(#[from] ServiceError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure is a lost race on a generation directory.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionAllocationConflict { .. })
    }
}
