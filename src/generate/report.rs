use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{PipelineError, Result};
use crate::models::{DirectoryNode, UNKNOWN_PLACEHOLDER, UNREADABLE_PLACEHOLDER};
use crate::service::count_words;
use crate::workspace;

/// Metrics file written into each generation directory.
pub const REPORT_FILE_NAME: &str = ".reports.md";

// Directories that never count towards file or line totals.
const IGNORED_DIRS: &[&str] = &["__pycache__", "venv"];

/// Size metrics of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Words in the prompt sent to the service.
    pub input_prompt_word_count: usize,
    /// Words in the raw text the service returned.
    pub output_prompt_word_count: usize,
    pub count_files: usize,
    pub count_loc: usize,
    pub generated_at: DateTime<Utc>,
}

impl GenerationReport {
    /// Measure `output_path` as it is on disk now.
    pub fn collect(prompt: &str, raw_text: &str, output_path: &Path) -> Result<Self> {
        let tree = workspace::load(output_path)?;
        let (count_files, count_loc) = measure(&tree);
        Ok(Self {
            input_prompt_word_count: count_words(prompt),
            output_prompt_word_count: count_words(raw_text),
            count_files,
            count_loc,
            generated_at: Utc::now(),
        })
    }

    pub fn render(&self) -> String {
        format!(
            "input_prompt_word_count = {}\n\
             output_prompt_word_count = {}\n\
             count_files = {}\n\
             count_loc = {}\n\
             generated_at = {}\n",
            self.input_prompt_word_count,
            self.output_prompt_word_count,
            self.count_files,
            self.count_loc,
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    pub fn write(&self, output_path: &Path) -> Result<PathBuf> {
        let path = output_path.join(REPORT_FILE_NAME);
        fs::write(&path, self.render()).map_err(|e| PipelineError::io(&path, e))?;
        Ok(path)
    }
}

/// Files and text lines below `tree`, skipping hidden and ignored directories.
fn measure(tree: &DirectoryNode) -> (usize, usize) {
    let (mut files, mut lines) = (0, 0);
    let mut stack: Vec<&DirectoryNode> = tree.children().iter().collect();
    while let Some(node) = stack.pop() {
        match node {
            DirectoryNode::Directory { name, children } => {
                if !name.starts_with('.') && !IGNORED_DIRS.contains(&name.as_str()) {
                    stack.extend(children.iter());
                }
            }
            DirectoryNode::File { content, .. } => {
                files += 1;
                if content != UNREADABLE_PLACEHOLDER && content != UNKNOWN_PLACEHOLDER {
                    lines += content.lines().count();
                }
            }
        }
    }
    (files, lines)
}
