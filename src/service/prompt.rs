use crate::models::DirectoryNode;

/// System message asking for a JSON-only answer.
pub const DEFAULT_SYSTEM_DIRECTIVE: &str = "You are a code generation assistant. \
You must respond ONLY with valid JSON. Do not include explanations, markdown code \
blocks, or any text outside the JSON structure.";

/// Describes the manifest shape the normalizer expects.
pub const MANIFEST_FORMAT_INSTRUCTIONS: &str = r#"Respond with a JSON array of files. Each element must be an object with exactly two string fields:

[
  {"path": "relative/path/to/file.ext", "contents": "full file contents"}
]

Paths are relative to the project root, use forward slashes, and must not start with "/" or contain "..".
Return ONLY the JSON array. No markdown, no explanations."#;

/// Compose the user prompt sent to the generation service.
///
/// With a template, its encoded tree is embedded as the starting point and the
/// service is asked to return only files it adds or changes.
pub fn build_prompt(goal: &str, template: Option<(&DirectoryNode, &str)>) -> String {
    match template {
        None => format!("{}\n\n{}", goal.trim(), MANIFEST_FORMAT_INSTRUCTIONS),
        Some((tree, encoded)) => format!(
            "{goal}\n\n\
             Use the following existing project ({files} files, JSON directory tree) \
             as the starting point:\n\n{encoded}\n\n\
             Return every file you add or modify. Files you do not return are kept unchanged.\n\n\
             {instructions}",
            goal = goal.trim(),
            files = tree.file_count(),
            encoded = encoded,
            instructions = MANIFEST_FORMAT_INSTRUCTIONS,
        ),
    }
}

/// Whitespace-separated word count, used for generation reports.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_prompt_carries_format_instructions() {
        let prompt = build_prompt("  hello world  ", None);
        assert!(prompt.starts_with("hello world\n\n"));
        assert!(prompt.contains("\"contents\""));
    }

    #[test]
    fn template_prompt_embeds_tree() {
        let tree = DirectoryNode::dir("tpl", vec![DirectoryNode::file("a.txt", "A")]);
        let prompt = build_prompt("add b", Some((&tree, "{\"type\":\"directory\"}")));
        assert!(prompt.contains("(1 files"));
        assert!(prompt.contains("{\"type\":\"directory\"}"));
        assert!(prompt.ends_with(MANIFEST_FORMAT_INSTRUCTIONS));
    }

    #[test]
    fn counts_words() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words(" one  two\nthree "), 3);
    }
}
