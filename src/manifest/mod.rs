//! Turns raw generation-service text into a validated manifest.
//!
//! Unparseable output never fails the pipeline: it is wrapped into a
//! two-entry fallback manifest so there is always something to write.
//! Entries that parse but are unusable (missing fields, unsafe paths) are
//! rejected according to [`Strictness`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::models::ManifestEntry;

/// File that receives the raw service output when it is not a manifest.
pub const FALLBACK_FILE_NAME: &str = "generated_output.txt";

/// Explanatory file written next to [`FALLBACK_FILE_NAME`].
pub const FALLBACK_NOTE_NAME: &str = "GENERATION_NOTE.md";

/// How to treat individual bad entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// The first bad entry fails the whole manifest.
    #[default]
    Strict,
    /// Bad entries are dropped and logged; the rest proceed.
    Lenient,
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown strictness '{other}'")),
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Lenient => f.write_str("lenient"),
        }
    }
}

/// An entry dropped in lenient mode.
#[derive(Debug, Clone)]
pub struct RejectedEntry {
    pub index: usize,
    pub reason: String,
}

/// Output of [`ManifestNormalizer::normalize`].
#[derive(Debug, Clone, Default)]
pub struct NormalizedManifest {
    /// Entries in their original order, duplicates included.
    pub entries: Vec<ManifestEntry>,
    pub rejected: Vec<RejectedEntry>,
    /// Set when the raw text was wrapped instead of parsed.
    pub fallback_reason: Option<String>,
}

impl NormalizedManifest {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestNormalizer {
    strictness: Strictness,
}

impl ManifestNormalizer {
    pub fn new(strictness: Strictness) -> Self {
        Self { strictness }
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn normalize(&self, raw_text: &str) -> Result<NormalizedManifest> {
        let items = match serde_json::from_str::<Value>(raw_text.trim()) {
            Ok(Value::Array(items)) if items.is_empty() => {
                return Ok(fallback(raw_text, "the manifest contained no entries"));
            }
            Ok(Value::Array(items)) => items,
            Ok(Value::Object(_)) => {
                return Ok(fallback(
                    raw_text,
                    "expected a list of entries but got a single object",
                ));
            }
            Ok(other) => {
                return Ok(fallback(
                    raw_text,
                    &format!("expected a list of entries but got {}", json_kind(&other)),
                ));
            }
            Err(e) => return Ok(fallback(raw_text, &format!("not valid JSON: {e}"))),
        };

        let mut normalized = NormalizedManifest::default();
        for (index, item) in items.iter().enumerate() {
            match parse_entry(item) {
                Ok(entry) => normalized.entries.push(entry),
                Err(err) => match self.strictness {
                    Strictness::Strict => return Err(err),
                    Strictness::Lenient => {
                        tracing::warn!(index, error = %err, "dropping manifest entry");
                        normalized.rejected.push(RejectedEntry {
                            index,
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }
        Ok(normalized)
    }
}

/// Normalize with [`Strictness::Strict`] and return only the entries.
pub fn normalize(raw_text: &str) -> Result<Vec<ManifestEntry>> {
    Ok(ManifestNormalizer::default().normalize(raw_text)?.entries)
}

fn parse_entry(item: &Value) -> Result<ManifestEntry> {
    let Value::Object(object) = item else {
        return Err(PipelineError::InvalidManifest(format!(
            "entry must be an object, got {}",
            json_kind(item)
        )));
    };
    let field = |key: &str| match object.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(PipelineError::InvalidManifest(format!(
            "'{key}' must be a string, got {}",
            json_kind(other)
        ))),
        None => Err(PipelineError::InvalidManifest(format!(
            "entry is missing '{key}'"
        ))),
    };

    let entry = ManifestEntry::new(field("path")?, field("contents")?);
    entry.relative_path()?;
    Ok(entry)
}

fn fallback(raw_text: &str, reason: &str) -> NormalizedManifest {
    tracing::warn!(reason, "generation output is not a manifest, using fallback");
    let note = format!(
        "# Generation note\n\n\
         The generation service response could not be used as a file manifest \
         ({reason}).\n\n\
         The raw response is stored verbatim in `{FALLBACK_FILE_NAME}`.\n"
    );
    NormalizedManifest {
        entries: vec![
            ManifestEntry::new(FALLBACK_FILE_NAME, raw_text),
            ManifestEntry::new(FALLBACK_NOTE_NAME, note),
        ],
        rejected: Vec::new(),
        fallback_reason: Some(reason.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
