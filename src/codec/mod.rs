//! JSON transport format for [`DirectoryNode`] trees.
//!
//! `encode` relies on the serde derive; `decode` validates the raw JSON by
//! hand so a violation names the node it happened on, e.g.
//! `$/project/src[2]: file node must not carry children`.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};
use crate::models::{safe_segment, DirectoryNode, MAX_DEPTH};

/// Encode a tree as pretty-printed JSON.
pub fn encode(tree: &DirectoryNode) -> Result<String> {
    Ok(serde_json::to_string_pretty(tree)?)
}

/// Decode and validate a tree from JSON text.
pub fn decode(text: &str) -> Result<DirectoryNode> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| PipelineError::schema("$", format!("not valid JSON: {e}")))?;
    decode_value(&value)
}

/// Validate an already parsed JSON value as a tree.
pub fn decode_value(value: &Value) -> Result<DirectoryNode> {
    decode_node(value, "$", 0)
}

/// JSON Schema of the transport format.
pub fn schema() -> Result<Value> {
    Ok(serde_json::to_value(schemars::schema_for!(DirectoryNode))?)
}

fn decode_node(value: &Value, path: &str, depth: usize) -> Result<DirectoryNode> {
    if depth > MAX_DEPTH {
        return Err(PipelineError::schema(
            path,
            format!("tree is nested deeper than {MAX_DEPTH} levels"),
        ));
    }

    let Value::Object(object) = value else {
        return Err(PipelineError::schema(path, "node must be a JSON object"));
    };

    if let Some(key) = object
        .keys()
        .find(|k| !matches!(k.as_str(), "type" | "name" | "content" | "children"))
    {
        return Err(PipelineError::schema(path, format!("unknown field '{key}'")));
    }

    let name = required_str(object, "name", path)?;
    if !safe_segment(name) {
        return Err(PipelineError::schema(
            path,
            format!("name '{name}' is not a single path segment"),
        ));
    }
    let node_path = format!("{path}/{name}");

    match required_str(object, "type", path)? {
        "file" => {
            if object.contains_key("children") {
                return Err(PipelineError::schema(
                    node_path,
                    "file node must not carry children",
                ));
            }
            let content = required_str(object, "content", &node_path)?;
            Ok(DirectoryNode::file(name, content))
        }
        "directory" => {
            if object.contains_key("content") {
                return Err(PipelineError::schema(
                    node_path,
                    "directory node must not carry content",
                ));
            }
            let Some(Value::Array(items)) = object.get("children") else {
                return Err(PipelineError::schema(
                    node_path,
                    "directory node requires a 'children' array",
                ));
            };

            let mut seen = HashSet::new();
            let mut children = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let child = decode_node(item, &format!("{node_path}[{index}]"), depth + 1)?;
                if !seen.insert(child.name().to_string()) {
                    return Err(PipelineError::schema(
                        format!("{node_path}[{index}]"),
                        format!("duplicate sibling name '{}'", child.name()),
                    ));
                }
                children.push(child);
            }
            Ok(DirectoryNode::dir(name, children))
        }
        other => Err(PipelineError::schema(
            node_path,
            format!("type must be 'file' or 'directory', got '{other}'"),
        )),
    }
}

fn required_str<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a str> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(PipelineError::schema(path, format!("'{key}' must be a string"))),
        None => Err(PipelineError::schema(path, format!("missing required '{key}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_offending_node_path() {
        let text = r#"{"type":"directory","name":"root","children":[
            {"type":"directory","name":"src","children":[
                {"type":"file","name":"a.rs","content":"x","children":[]}
            ]}
        ]}"#;
        match decode(text).unwrap_err() {
            PipelineError::SchemaViolation { path, reason } => {
                assert_eq!(path, "$/root[0]/src[0]/a.rs");
                assert!(reason.contains("children"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn schema_lists_both_variants() {
        let schema = schema().unwrap().to_string();
        assert!(schema.contains("\"file\""));
        assert!(schema.contains("\"directory\""));
    }
}
