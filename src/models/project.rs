use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One generation of a named project.
///
/// Generations live at `projects_root/<name>/<generation>/` and are never
/// rewritten once the orchestrator has returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Positive, strictly increasing per project name.
    pub generation: u32,
    pub root_path: PathBuf,
}

/// A queued generate → replay job, as read by the `batch` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub project: String,
    pub prompt: String,
    #[serde(default)]
    pub template: Option<PathBuf>,
}

/// Summary of a single batch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub project: String,
    /// Set when generation succeeded.
    pub output_path: Option<PathBuf>,
    /// `PASSED`/`FAILED` when replay ran.
    pub replay: Option<String>,
    pub error: Option<String>,
}
