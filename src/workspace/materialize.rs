use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::models::{safe_segment, DirectoryNode, ManifestEntry, MAX_DEPTH};

/// Validate every entry path up front so nothing is written when one is unsafe.
pub(crate) fn resolve_entries(entries: &[ManifestEntry]) -> Result<Vec<(PathBuf, &str)>> {
    entries
        .iter()
        .map(|e| Ok((e.relative_path()?, e.contents.as_str())))
        .collect()
}

/// Write manifest entries under `destination_root`.
///
/// Missing ancestor directories are created, existing files are overwritten
/// and a later duplicate path wins. Nothing outside the entry paths is touched.
/// Returns the number of files written.
pub fn materialize(entries: &[ManifestEntry], destination_root: &Path) -> Result<usize> {
    let resolved = resolve_entries(entries)?;
    write_resolved(&resolved, destination_root)
}

pub(crate) fn write_resolved(resolved: &[(PathBuf, &str)], destination_root: &Path) -> Result<usize> {
    ensure_dir(destination_root)?;
    for (relative, contents) in resolved {
        write_file(&destination_root.join(relative), contents)?;
    }
    tracing::debug!(
        files = resolved.len(),
        root = %destination_root.display(),
        "materialized manifest"
    );
    Ok(resolved.len())
}

/// Write a tree under `destination_root`.
///
/// The root directory's children land directly in `destination_root`; a root
/// file is written as `destination_root/<name>`. Empty directories are created.
/// Returns the number of files written.
pub fn materialize_tree(tree: &DirectoryNode, destination_root: &Path) -> Result<usize> {
    validate_tree(tree)?;
    ensure_dir(destination_root)?;

    let mut written = 0;
    let mut stack: Vec<(&DirectoryNode, PathBuf)> = match tree {
        DirectoryNode::Directory { children, .. } => children
            .iter()
            .map(|c| (c, destination_root.to_path_buf()))
            .collect(),
        DirectoryNode::File { .. } => vec![(tree, destination_root.to_path_buf())],
    };

    while let Some((node, parent)) = stack.pop() {
        let target = parent.join(node.name());
        match node {
            DirectoryNode::File { content, .. } => {
                write_file(&target, content)?;
                written += 1;
            }
            DirectoryNode::Directory { children, .. } => {
                ensure_dir(&target)?;
                stack.extend(children.iter().map(|c| (c, target.clone())));
            }
        }
    }
    Ok(written)
}

fn validate_tree(tree: &DirectoryNode) -> Result<()> {
    let mut stack = vec![(tree, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            return Err(PipelineError::DepthLimitExceeded {
                path: PathBuf::from(node.name()),
                limit: MAX_DEPTH,
            });
        }
        // A root directory's name is never used as a path segment.
        if (depth > 0 || !node.is_dir()) && !safe_segment(node.name()) {
            return Err(PipelineError::PathTraversal {
                path: node.name().to_string(),
            });
        }
        stack.extend(node.children().iter().map(|c| (c, depth + 1)));
    }
    Ok(())
}

pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| PipelineError::io(path, e))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).map_err(|e| PipelineError::io(path, e))
}
