use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::models::{DirectoryNode, MAX_DEPTH, UNKNOWN_PLACEHOLDER, UNREADABLE_PLACEHOLDER};

/// Walk `root_path` into a [`DirectoryNode`] tree.
///
/// Children are sorted by name at every level. Files that are not valid UTF-8
/// or cannot be read become [`UNREADABLE_PLACEHOLDER`]; symlinks and special
/// files become [`UNKNOWN_PLACEHOLDER`]. A subdirectory that cannot be listed
/// is kept as an empty directory. Only a missing or non-directory root, or
/// nodes deeper than [`MAX_DEPTH`], fail.
pub fn load(root_path: &Path) -> Result<DirectoryNode> {
    let meta = fs::metadata(root_path).map_err(|e| PipelineError::io(root_path, e))?;
    if !meta.is_dir() {
        return Err(PipelineError::io(
            root_path,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    let root_name = fs::canonicalize(root_path)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "root".to_string());
    let mut root = DirectoryNode::dir(root_name, Vec::new());

    // (absolute dir, segments below root, depth)
    let mut stack: Vec<(PathBuf, Vec<String>, usize)> = vec![(root_path.to_path_buf(), Vec::new(), 0)];

    while let Some((dir_path, segments, depth)) = stack.pop() {
        let mut entries = match list_dir(&dir_path) {
            Ok(entries) => entries,
            Err(e) if depth > 0 => {
                tracing::warn!(path = %dir_path.display(), error = %e, "cannot list directory");
                continue;
            }
            Err(e) => return Err(PipelineError::io(&dir_path, e)),
        };
        // Entries of this directory are nodes at `depth + 1`.
        if !entries.is_empty() && depth >= MAX_DEPTH {
            return Err(PipelineError::DepthLimitExceeded {
                path: dir_path,
                limit: MAX_DEPTH,
            });
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let Some(dir_node) = dir_at(&mut root, &segments) else {
            continue;
        };

        for (name, path) in entries {
            let kind = fs::symlink_metadata(&path).map(|m| m.file_type());
            match kind {
                Ok(ft) if ft.is_dir() => {
                    dir_node.upsert_child(DirectoryNode::dir(&name, Vec::new()));
                    let mut child_segments = segments.clone();
                    child_segments.push(name);
                    stack.push((path, child_segments, depth + 1));
                }
                Ok(ft) if ft.is_file() => {
                    dir_node.upsert_child(DirectoryNode::file(name, read_text(&path)));
                }
                Ok(_) => {
                    dir_node.upsert_child(DirectoryNode::file(name, UNKNOWN_PLACEHOLDER));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot stat entry");
                    dir_node.upsert_child(DirectoryNode::file(name, UNREADABLE_PLACEHOLDER));
                }
            }
        }
    }
    Ok(root)
}

fn list_dir(path: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    fs::read_dir(path)?
        .map(|entry| {
            let entry = entry?;
            Ok((entry.file_name().to_string_lossy().into_owned(), entry.path()))
        })
        .collect()
}

fn read_text(path: &Path) -> String {
    match fs::read(path).map(String::from_utf8) {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => UNREADABLE_PLACEHOLDER.to_string(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read file");
            UNREADABLE_PLACEHOLDER.to_string()
        }
    }
}

fn dir_at<'a>(root: &'a mut DirectoryNode, segments: &[String]) -> Option<&'a mut DirectoryNode> {
    let mut node = root;
    for segment in segments {
        node = node.ensure_child_dir(segment)?;
    }
    Some(node)
}
