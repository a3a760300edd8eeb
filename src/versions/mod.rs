//! Generation numbering for `projects_root/<project>/<n>/` directories.
//!
//! The numbered directories themselves are the counter. Allocation scans for
//! the highest number and claims the next one with an exclusive
//! `create_dir`; a caller that loses the race gets
//! [`PipelineError::VersionAllocationConflict`] and rescans. Allocation takes
//! no lock; only the `latest_dir.txt` pointer update does.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;

use crate::error::{PipelineError, Result};
use crate::models::{safe_segment, Project};

/// Pointer file rewritten after each successful generation.
pub const LATEST_FILE_NAME: &str = "latest_dir.txt";

/// Check that a project name is usable as a single directory name.
pub fn validate_project_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || !safe_segment(name) {
        return Err(PipelineError::InvalidProjectName(name.to_string()));
    }
    Ok(())
}

/// Existing generation numbers of a project, ascending.
///
/// Only directories whose name is a canonical positive integer count, so
/// `latest_dir.txt`, `007` or stray files never affect numbering.
pub fn list_generations(projects_root: &Path, project_name: &str) -> Result<Vec<u32>> {
    validate_project_name(project_name)?;
    let project_dir = projects_root.join(project_name);

    let entries = match fs::read_dir(&project_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PipelineError::io(&project_dir, e)),
    };

    let mut generations = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(&project_dir, e))?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        if let Some(n) = entry.file_name().to_str().and_then(parse_generation) {
            generations.push(n);
        }
    }
    generations.sort_unstable();
    Ok(generations)
}

fn parse_generation(name: &str) -> Option<u32> {
    let n: u32 = name.parse().ok()?;
    (n > 0 && n.to_string() == name).then_some(n)
}

/// Claim the next generation directory of `project_name`.
///
/// Fails with [`PipelineError::VersionAllocationConflict`] if another writer
/// created the same directory between the scan and the create.
pub fn allocate(projects_root: &Path, project_name: &str) -> Result<Project> {
    let generations = list_generations(projects_root, project_name)?;
    let next = generations.last().map_or(Some(1), |n| n.checked_add(1));
    let Some(generation) = next else {
        return Err(PipelineError::InvalidProjectName(format!(
            "{project_name}: generation counter exhausted"
        )));
    };
    claim(projects_root, project_name, generation)
}

/// Exclusively create `<project>/<generation>/`.
fn claim(projects_root: &Path, project_name: &str, generation: u32) -> Result<Project> {
    let project_dir = projects_root.join(project_name);
    fs::create_dir_all(&project_dir).map_err(|e| PipelineError::io(&project_dir, e))?;

    let root_path = project_dir.join(generation.to_string());
    match fs::create_dir(&root_path) {
        Ok(()) => {
            tracing::debug!(project = project_name, generation, "allocated generation");
            Ok(Project {
                name: project_name.to_string(),
                generation,
                root_path,
            })
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(PipelineError::VersionAllocationConflict {
                project: project_name.to_string(),
                generation,
            })
        }
        Err(e) => Err(PipelineError::io(&root_path, e)),
    }
}

/// [`allocate`] with a fresh scan after each conflict, up to `attempts` tries.
pub fn allocate_with_retry(projects_root: &Path, project_name: &str, attempts: u32) -> Result<Project> {
    retry_conflicts(project_name, attempts, || allocate(projects_root, project_name))
}

fn retry_conflicts<T>(
    project_name: &str,
    attempts: u32,
    mut step: impl FnMut() -> Result<T>,
) -> Result<T> {
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match step() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_conflict() => {
                tracing::debug!(project = project_name, attempt, "allocation conflict, rescanning");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| PipelineError::VersionAllocationConflict {
        project: project_name.to_string(),
        generation: 0,
    }))
}

/// Record `generation` in `<project>/latest_dir.txt` unless a newer one is
/// already recorded.
///
/// Concurrent generations finish in any order, so the compare and the write
/// happen under an exclusive lock on `.latest_dir.txt.lock`. The value is
/// written through a temporary file and a rename so lock-free readers never
/// see a partial number. Returns the generation the pointer holds afterwards.
pub fn update_latest(projects_root: &Path, project_name: &str, generation: u32) -> Result<u32> {
    let project_dir = projects_root.join(project_name);
    let latest = project_dir.join(LATEST_FILE_NAME);
    let lock_path = project_dir.join(format!(".{LATEST_FILE_NAME}.lock"));

    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| PipelineError::io(&lock_path, e))?;
    lock.lock_exclusive().map_err(|e| PipelineError::io(&lock_path, e))?;

    let recorded = read_latest(projects_root, project_name)?;
    let result = match recorded {
        Some(current) if current >= generation => {
            tracing::debug!(project = project_name, generation, current, "latest pointer already newer");
            Ok(current)
        }
        _ => {
            let staging = project_dir.join(format!(".{LATEST_FILE_NAME}.tmp"));
            fs::write(&staging, generation.to_string())
                .and_then(|()| fs::rename(&staging, &latest))
                .map(|()| generation)
                .map_err(|e| PipelineError::io(&latest, e))
        }
    };

    if let Err(e) = FileExt::unlock(&lock) {
        tracing::warn!(path = %lock_path.display(), error = %e, "failed to release latest pointer lock");
    }
    result
}

/// Read the generation recorded by [`update_latest`], if any.
pub fn read_latest(projects_root: &Path, project_name: &str) -> Result<Option<u32>> {
    let latest = projects_root.join(project_name).join(LATEST_FILE_NAME);
    match fs::read_to_string(&latest) {
        Ok(text) => Ok(text.trim().parse().ok()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PipelineError::io(&latest, e)),
    }
}
