use std::fs;
use std::path::{Path, PathBuf};

use super::materialize::{ensure_dir, resolve_entries, write_resolved};
use crate::error::{PipelineError, Result};
use crate::models::{ManifestEntry, MAX_DEPTH};

/// Copy `template_root` into `destination_root`, then write `entries` on top.
///
/// Template files the manifest does not mention are left as copied. Without a
/// template this is plain [`super::materialize`]. Entry paths are validated
/// before the copy starts. Returns the number of manifest files written.
pub fn overlay(
    template_root: Option<&Path>,
    entries: &[ManifestEntry],
    destination_root: &Path,
) -> Result<usize> {
    let resolved = resolve_entries(entries)?;
    if let Some(template) = template_root {
        let copied = copy_tree(template, destination_root)?;
        tracing::debug!(
            copied,
            template = %template.display(),
            "copied template"
        );
    }
    write_resolved(&resolved, destination_root)
}

/// Check that a template path is an existing directory.
pub fn require_template(template_root: &Path) -> Result<()> {
    match fs::metadata(template_root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => Err(PipelineError::TemplateNotFound {
            path: template_root.to_path_buf(),
        }),
    }
}

/// Recursively copy regular files and directories byte-for-byte.
///
/// Symlinks and other special entries are skipped with a warning. Returns the
/// number of files copied.
pub fn copy_tree(template_root: &Path, destination_root: &Path) -> Result<usize> {
    require_template(template_root)?;
    ensure_dir(destination_root)?;
    // Keeps a destination nested inside the template from being copied into itself.
    let destination = fs::canonicalize(destination_root)
        .map_err(|e| PipelineError::io(destination_root, e))?;

    let mut copied = 0;
    let mut stack: Vec<(PathBuf, PathBuf, usize)> = vec![(
        template_root.to_path_buf(),
        destination_root.to_path_buf(),
        0,
    )];

    while let Some((source_dir, target_dir, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            return Err(PipelineError::DepthLimitExceeded {
                path: source_dir,
                limit: MAX_DEPTH,
            });
        }

        let mut entries = fs::read_dir(&source_dir)
            .map_err(|e| PipelineError::io(&source_dir, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::io(&source_dir, e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let source = entry.path();
            let target = target_dir.join(entry.file_name());
            let file_type = entry
                .file_type()
                .map_err(|e| PipelineError::io(&source, e))?;

            if file_type.is_dir() {
                if fs::canonicalize(&source).is_ok_and(|p| p == destination) {
                    continue;
                }
                ensure_dir(&target)?;
                stack.push((source, target, depth + 1));
            } else if file_type.is_file() {
                fs::copy(&source, &target).map_err(|e| PipelineError::io(&target, e))?;
                copied += 1;
            } else {
                tracing::warn!(path = %source.display(), "skipping non-regular template entry");
            }
        }
    }
    Ok(copied)
}
