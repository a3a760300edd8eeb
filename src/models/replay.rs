use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Pass/fail signal of a replay run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplayOutcome {
    Passed,
    Failed,
}

impl ReplayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "PASSED" => Some(Self::Passed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for ReplayOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of replaying a generated project's entrypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    pub outcome: ReplayOutcome,
    /// The executed entrypoint; `None` when no entrypoint was found.
    pub entrypoint: Option<PathBuf>,
    /// Exit code of the entrypoint process, when it ran to completion.
    pub exit_code: Option<i32>,
    /// Why the run failed without an exit code (no entrypoint, launch error).
    pub reason: Option<String>,
    /// Location of the persisted `PASSED`/`FAILED` file.
    pub result_file: PathBuf,
}
