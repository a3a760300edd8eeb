use genforge::codec;
use genforge::models::*;
use genforge::PipelineError;
use speculate2::speculate;

fn sample_tree() -> DirectoryNode {
    DirectoryNode::dir(
        "demo",
        vec![
            DirectoryNode::file("README.md", "# demo\n"),
            DirectoryNode::dir(
                "src",
                vec![
                    DirectoryNode::file("main.rs", "fn main() {}\n"),
                    DirectoryNode::dir("empty", vec![]),
                ],
            ),
        ],
    )
}

fn violation_path(text: &str) -> String {
    match codec::decode(text) {
        Err(PipelineError::SchemaViolation { path, .. }) => path,
        other => panic!("expected SchemaViolation, got {:?}", other),
    }
}

speculate! {
    describe "encode" {
        it "tags nodes with their type" {
            let encoded = codec::encode(&DirectoryNode::file("a.txt", "A")).expect("encode failed");
            let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

            assert_eq!(value["type"], "file");
            assert_eq!(value["name"], "a.txt");
            assert_eq!(value["content"], "A");
        }

        it "keeps children in order" {
            let encoded = codec::encode(&sample_tree()).expect("encode failed");
            let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

            assert_eq!(value["type"], "directory");
            assert_eq!(value["children"][0]["name"], "README.md");
            assert_eq!(value["children"][1]["children"][1]["type"], "directory");
        }
    }

    describe "decode" {
        it "reconstructs an encoded tree" {
            let tree = sample_tree();
            let decoded = codec::decode(&codec::encode(&tree).unwrap()).expect("decode failed");
            assert_eq!(decoded, tree);
        }

        it "keeps empty files and directories" {
            let tree = DirectoryNode::dir("r", vec![
                DirectoryNode::file("empty.txt", ""),
                DirectoryNode::dir("nothing", vec![]),
            ]);
            let decoded = codec::decode(&codec::encode(&tree).unwrap()).unwrap();
            assert_eq!(decoded, tree);
        }

        it "rejects text that is not JSON" {
            assert_eq!(violation_path("not json"), "$");
        }

        it "rejects an unknown type" {
            let err = codec::decode(r#"{"type":"link","name":"x"}"#).unwrap_err();
            assert!(err.to_string().contains("link"));
        }

        it "rejects a file with children" {
            let path = violation_path(r#"{"type":"file","name":"a","content":"","children":[]}"#);
            assert_eq!(path, "$/a");
        }

        it "rejects a directory with content" {
            let path = violation_path(r#"{"type":"directory","name":"d","content":"x","children":[]}"#);
            assert_eq!(path, "$/d");
        }

        it "rejects a file without content" {
            assert_eq!(violation_path(r#"{"type":"file","name":"a"}"#), "$/a");
        }

        it "rejects unknown fields" {
            let err = codec::decode(r#"{"type":"file","name":"a","content":"","mode":644}"#).unwrap_err();
            assert!(err.to_string().contains("mode"));
        }

        it "names the offending nested node" {
            let text = r#"{"type":"directory","name":"root","children":[
                {"type":"directory","name":"src","children":[
                    {"type":"file","name":"a.rs","content":1}
                ]}
            ]}"#;
            assert_eq!(violation_path(text), "$/root[0]/src[0]/a.rs");
        }

        it "rejects duplicate sibling names" {
            let text = r#"{"type":"directory","name":"r","children":[
                {"type":"file","name":"a","content":"1"},
                {"type":"file","name":"a","content":"2"}
            ]}"#;
            let err = codec::decode(text).unwrap_err();
            assert!(matches!(err, PipelineError::SchemaViolation { .. }));
        }

        it "rejects names that are not a single segment" {
            let text = r#"{"type":"directory","name":"r","children":[
                {"type":"file","name":"../escape","content":""}
            ]}"#;
            assert!(matches!(codec::decode(text), Err(PipelineError::SchemaViolation { .. })));
        }

        it "round-trips a tree exactly at the depth limit" {
            let mut tree = DirectoryNode::file("leaf.txt", "deep");
            for i in 0..MAX_DEPTH {
                tree = DirectoryNode::dir(format!("d{}", i), vec![tree]);
            }
            let decoded = codec::decode(&codec::encode(&tree).unwrap()).expect("decode failed");
            assert_eq!(decoded, tree);
        }

        it "round-trips an empty directory at the depth limit" {
            let mut tree = DirectoryNode::dir("bottom", vec![]);
            for i in 0..MAX_DEPTH {
                tree = DirectoryNode::dir(format!("d{}", i), vec![tree]);
            }
            let decoded = codec::decode(&codec::encode(&tree).unwrap()).expect("decode failed");
            assert_eq!(decoded, tree);
        }

        it "rejects trees deeper than the depth limit" {
            let mut tree = DirectoryNode::file("leaf", "");
            for i in 0..=MAX_DEPTH {
                tree = DirectoryNode::dir(format!("d{}", i), vec![tree]);
            }
            let encoded = codec::encode(&tree).unwrap();
            assert!(matches!(codec::decode(&encoded), Err(PipelineError::SchemaViolation { .. })));
        }
    }

    describe "schema" {
        it "describes both node variants" {
            let schema = codec::schema().expect("schema failed");
            let text = schema.to_string();
            assert!(text.contains("\"file\""));
            assert!(text.contains("\"directory\""));
        }
    }
}
