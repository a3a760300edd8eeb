//! ASCII tree rendering for directory trees.

use crate::models::DirectoryNode;

/// Render a directory tree as ASCII art. Directories carry a trailing `/`.
///
/// Example output:
/// ```text
/// demo/
/// ├── README.md
/// └── src/
///     ├── lib.rs
///     └── main.rs
/// ```
pub fn render_tree(root: &DirectoryNode) -> String {
    let mut output = String::new();
    render_node(&mut output, root, "", true, true);
    output
}

fn label(node: &DirectoryNode) -> String {
    if node.is_dir() {
        format!("{}/", node.name())
    } else {
        node.name().to_string()
    }
}

fn render_node(
    output: &mut String,
    node: &DirectoryNode,
    prefix: &str,
    is_last: bool,
    is_root: bool,
) {
    if !is_root {
        output.push_str(prefix);
        output.push_str(if is_last { "└── " } else { "├── " });
    }
    output.push_str(&label(node));
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    let children = node.children();
    for (i, child) in children.iter().enumerate() {
        render_node(output, child, &child_prefix, i == children.len() - 1, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_root() {
        let tree = DirectoryNode::dir("demo", vec![]);
        assert_eq!(render_tree(&tree), "demo/\n");
    }

    #[test]
    fn test_single_file() {
        let tree = DirectoryNode::file("notes.txt", "hi");
        assert_eq!(render_tree(&tree), "notes.txt\n");
    }

    #[test]
    fn test_nested_children() {
        let tree = DirectoryNode::dir(
            "demo",
            vec![
                DirectoryNode::file("README.md", "# demo"),
                DirectoryNode::dir(
                    "src",
                    vec![
                        DirectoryNode::dir("bin", vec![DirectoryNode::file("cli.rs", "")]),
                        DirectoryNode::file("lib.rs", ""),
                    ],
                ),
                DirectoryNode::file("setup_and_run.sh", "exit 0"),
            ],
        );
        let expected = "demo/\n├── README.md\n├── src/\n│   ├── bin/\n│   │   └── cli.rs\n│   └── lib.rs\n└── setup_and_run.sh\n";
        assert_eq!(render_tree(&tree), expected);
    }
}
