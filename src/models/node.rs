use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::entry::ManifestEntry;

/// Content stored for files that exist but cannot be read as UTF-8 text.
pub const UNREADABLE_PLACEHOLDER: &str = "<unreadable>";

/// Content stored for entries that are neither regular files nor directories
/// (symlinks, sockets, devices).
pub const UNKNOWN_PLACEHOLDER: &str = "<unknown>";

/// Deepest node depth (root = 0) accepted by every tree walker in the crate.
///
/// Each tree level costs two JSON nesting levels, so an encoded tree at this
/// depth stays under serde_json's nesting limit of 128.
pub const MAX_DEPTH: usize = 60;

/// One node of a portable directory tree.
///
/// Serialized as a JSON object tagged by `type`:
///
/// ```json
/// {"type": "directory", "name": "src", "children": [
///     {"type": "file", "name": "main.rs", "content": "fn main() {}"}
/// ]}
/// ```
///
/// Sibling names are unique. Children keep the order they were inserted in;
/// the directory loader inserts them sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum DirectoryNode {
    File {
        name: String,
        content: String,
    },
    Directory {
        name: String,
        children: Vec<DirectoryNode>,
    },
}

impl DirectoryNode {
    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::File {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn dir(name: impl Into<String>, children: Vec<DirectoryNode>) -> Self {
        Self::Directory {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Directory { name, .. } => name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    /// Children of a directory; files have none.
    pub fn children(&self) -> &[DirectoryNode] {
        match self {
            Self::Directory { children, .. } => children,
            Self::File { .. } => &[],
        }
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> Option<&DirectoryNode> {
        self.children().iter().find(|c| c.name() == name)
    }

    /// Mutable access to a child directory, creating it if missing.
    ///
    /// Returns `None` when `self` is a file or when a file already holds the name.
    pub(crate) fn ensure_child_dir(&mut self, name: &str) -> Option<&mut DirectoryNode> {
        let Self::Directory { children, .. } = self else {
            return None;
        };
        let index = match children.iter().position(|c| c.name() == name) {
            Some(i) => i,
            None => {
                children.push(Self::dir(name, Vec::new()));
                children.len() - 1
            }
        };
        let child = &mut children[index];
        child.is_dir().then_some(child)
    }

    /// Insert or replace a child by name. No-op on files.
    pub(crate) fn upsert_child(&mut self, node: DirectoryNode) {
        if let Self::Directory { children, .. } = self {
            match children.iter_mut().find(|c| c.name() == node.name()) {
                Some(existing) => *existing = node,
                None => children.push(node),
            }
        }
    }

    /// Number of file nodes in the subtree.
    pub fn file_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::File { .. } => count += 1,
                Self::Directory { children, .. } => stack.extend(children.iter()),
            }
        }
        count
    }

    /// Flatten the tree into manifest entries relative to this node.
    ///
    /// The root's own name is not part of the paths. Entries come out
    /// depth-first in children order.
    pub fn to_manifest(&self) -> Vec<ManifestEntry> {
        let mut entries = Vec::new();
        // (node, parent path) pairs; reversed pushes keep children order.
        let mut stack: Vec<(&DirectoryNode, String)> = self
            .children()
            .iter()
            .rev()
            .map(|c| (c, String::new()))
            .collect();
        if let Self::File { .. } = self {
            stack.push((self, String::new()));
        }

        while let Some((node, parent)) = stack.pop() {
            let path = if parent.is_empty() {
                node.name().to_string()
            } else {
                format!("{}/{}", parent, node.name())
            };
            match node {
                Self::File { content, .. } => entries.push(ManifestEntry::new(path, content.clone())),
                Self::Directory { children, .. } => {
                    for child in children.iter().rev() {
                        stack.push((child, path.clone()));
                    }
                }
            }
        }
        entries
    }

    /// Build a tree from a flat manifest. A later duplicate path replaces an
    /// earlier one; a file path that collides with a directory is skipped.
    pub fn from_manifest(root_name: impl Into<String>, entries: &[ManifestEntry]) -> Self {
        let mut root = Self::dir(root_name, Vec::new());
        for entry in entries {
            let segments: Vec<&str> = entry
                .path
                .split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .collect();
            let Some((file_name, parents)) = segments.split_last() else {
                continue;
            };

            let mut node = Some(&mut root);
            for segment in parents {
                node = node.and_then(|n| n.ensure_child_dir(segment));
            }
            match node {
                Some(dir) if !dir.child(file_name).is_some_and(|c| c.is_dir()) => {
                    dir.upsert_child(Self::file(*file_name, entry.contents.clone()));
                }
                _ => tracing::warn!(path = %entry.path, "manifest path collides with a directory, skipped"),
            }
        }
        root
    }
}
