//! Runs a generation's setup/test entrypoint and records PASSED/FAILED.
//!
//! The outcome goes to `<output_path>/replay/test_bool.txt`, the location the
//! generated test templates write to themselves, and is overwritten on every
//! run. A missing entrypoint is a FAILED outcome, not an error.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::models::{ReplayOutcome, ReplayResult, MAX_DEPTH};

/// Entrypoint file name generated projects are asked to provide.
pub const DEFAULT_ENTRYPOINT: &str = "setup_and_run.sh";

pub const REPLAY_DIR: &str = "replay";
pub const RESULT_FILE_NAME: &str = "test_bool.txt";
pub const LOG_FILE_NAME: &str = "replay.log";

// ENOEXEC: no interpreter line; ETXTBSY: a forked sibling still holds a write fd.
const ENOEXEC: i32 = 8;
const ETXTBSY: i32 = 26;
const BUSY_RETRIES: u32 = 5;

/// Replay with the default entrypoint name.
pub fn replay(output_path: &Path) -> Result<ReplayResult> {
    replay_with(output_path, DEFAULT_ENTRYPOINT)
}

/// Find `entrypoint_name` under `output_path`, run it and persist the outcome.
pub fn replay_with(output_path: &Path, entrypoint_name: &str) -> Result<ReplayResult> {
    let result_file = output_path.join(REPLAY_DIR).join(RESULT_FILE_NAME);

    let Some(entrypoint) = find_entrypoint(output_path, entrypoint_name)? else {
        tracing::warn!(
            path = %output_path.display(),
            entrypoint = entrypoint_name,
            "no entrypoint found"
        );
        let result = ReplayResult {
            outcome: ReplayOutcome::Failed,
            entrypoint: None,
            exit_code: None,
            reason: Some(format!("no entrypoint named '{entrypoint_name}'")),
            result_file,
        };
        persist(output_path, &result, None)?;
        return Ok(result);
    };

    make_executable(&entrypoint)?;
    tracing::info!(entrypoint = %entrypoint.display(), "running entrypoint");

    let result = match run(&entrypoint) {
        Ok(output) => {
            let outcome = if output.status.success() {
                ReplayOutcome::Passed
            } else {
                ReplayOutcome::Failed
            };
            let result = ReplayResult {
                outcome,
                entrypoint: Some(entrypoint),
                exit_code: output.status.code(),
                reason: None,
                result_file,
            };
            persist(output_path, &result, Some(&output))?;
            result
        }
        Err(e) => {
            tracing::warn!(entrypoint = %entrypoint.display(), error = %e, "entrypoint failed to launch");
            let result = ReplayResult {
                outcome: ReplayOutcome::Failed,
                entrypoint: Some(entrypoint),
                exit_code: None,
                reason: Some(format!("failed to launch: {e}")),
                result_file,
            };
            persist(output_path, &result, None)?;
            result
        }
    };

    tracing::info!(outcome = %result.outcome, exit_code = ?result.exit_code, "replay finished");
    Ok(result)
}

/// Breadth-first search with sorted entries: the shallowest, lexically first
/// match wins. The replay artifact directory is not searched.
pub fn find_entrypoint(output_path: &Path, entrypoint_name: &str) -> Result<Option<PathBuf>> {
    let mut queue = VecDeque::from([(output_path.to_path_buf(), 0usize)]);

    while let Some((dir, depth)) = queue.pop_front() {
        let listing = fs::read_dir(&dir).and_then(|rd| rd.collect::<io::Result<Vec<_>>>());
        let mut entries = match listing {
            Ok(entries) => entries,
            Err(e) if depth == 0 => return Err(PipelineError::io(&dir, e)),
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "cannot list directory");
                continue;
            }
        };
        entries.sort_by_key(|e| e.file_name());

        for entry in &entries {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file && entry.file_name() == entrypoint_name {
                return Ok(Some(entry.path()));
            }
        }
        if depth >= MAX_DEPTH {
            continue;
        }
        for entry in entries {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && !(depth == 0 && entry.file_name() == REPLAY_DIR) {
                queue.push_back((entry.path(), depth + 1));
            }
        }
    }
    Ok(None)
}

/// Read a previously persisted outcome.
pub fn read_outcome(output_path: &Path) -> Result<Option<ReplayOutcome>> {
    let path = output_path.join(REPLAY_DIR).join(RESULT_FILE_NAME);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(ReplayOutcome::from_str(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PipelineError::io(&path, e)),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| PipelineError::io(path, e))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn run(entrypoint: &Path) -> io::Result<Output> {
    let workdir = entrypoint.parent().unwrap_or(Path::new("."));
    let mut attempt = 0;
    loop {
        match Command::new(entrypoint).current_dir(workdir).output() {
            Err(e) if e.raw_os_error() == Some(ENOEXEC) => {
                return Command::new("sh").arg(entrypoint).current_dir(workdir).output();
            }
            Err(e) if e.raw_os_error() == Some(ETXTBSY) && attempt < BUSY_RETRIES => {
                attempt += 1;
                thread::sleep(Duration::from_millis(20 * u64::from(attempt)));
            }
            other => return other,
        }
    }
}

fn persist(output_path: &Path, result: &ReplayResult, output: Option<&Output>) -> Result<()> {
    let replay_dir = output_path.join(REPLAY_DIR);
    fs::create_dir_all(&replay_dir).map_err(|e| PipelineError::io(&replay_dir, e))?;

    fs::write(&result.result_file, result.outcome.as_str())
        .map_err(|e| PipelineError::io(&result.result_file, e))?;

    let mut log = String::new();
    if let Some(entrypoint) = &result.entrypoint {
        log.push_str(&format!("entrypoint: {}\n", entrypoint.display()));
    }
    if let Some(reason) = &result.reason {
        log.push_str(&format!("reason: {reason}\n"));
    }
    if let Some(output) = output {
        log.push_str(&format!("exit: {}\n", output.status));
        log.push_str("--- stdout ---\n");
        log.push_str(&String::from_utf8_lossy(&output.stdout));
        log.push_str("\n--- stderr ---\n");
        log.push_str(&String::from_utf8_lossy(&output.stderr));
    }
    let log_path = replay_dir.join(LOG_FILE_NAME);
    fs::write(&log_path, log).map_err(|e| PipelineError::io(&log_path, e))
}
