use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use capability::SpanExtraction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a text came from, relative to this pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Organic,
    Synthetic,
}

/// One text with the result of every extraction capability applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text_id: String,
    pub text: String,
    /// capability name -> structured output. A capability whose backend
    /// response failed to parse is simply absent.
    #[serde(default)]
    pub results: BTreeMap<String, SpanExtraction>,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub capabilities_applied: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

/// Self-describing batch of extraction results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub batch_id: String,
    #[serde(default)]
    pub texts: Vec<ExtractedText>,
    pub created_at: DateTime<Utc>,
}

impl ExtractionBatch {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}

/// `"{prefix}_{8 hex chars}"`, e.g. `batch_3fa91c04`.
pub fn new_batch_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..8])
}

/// Write any serializable document as pretty JSON, creating parent dirs.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write: {}", path.display()))
}

pub fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::LabeledSpan;

    fn sample_batch() -> ExtractionBatch {
        let mut results = BTreeMap::new();
        results.insert(
            "alerts".to_string(),
            SpanExtraction {
                has_labels: true,
                spans: vec![LabeledSpan {
                    excerpt: "they cooked the books".into(),
                    label: "fraud".into(),
                    reasoning: "describes falsified records".into(),
                    extra: Default::default(),
                }],
                classification: None,
                classification_reasoning: String::new(),
            },
        );

        ExtractionBatch {
            batch_id: new_batch_id("batch"),
            texts: vec![ExtractedText {
                text_id: "text_0001".into(),
                text: "they cooked the books last quarter".into(),
                results,
                source: Source::Organic,
                capabilities_applied: vec!["alerts".into()],
                processed_at: Utc::now(),
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn batch_ids_carry_prefix_and_short_hex() {
        let id = new_batch_id("batch");
        assert!(id.starts_with("batch_"));
        assert_eq!(id.len(), "batch_".len() + 8);
    }

    #[test]
    fn save_load_round_trip() {
        let batch = sample_batch();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/extraction.json");

        batch.save(&path).unwrap();
        let loaded = ExtractionBatch::load(&path).unwrap();
        assert_eq!(batch, loaded);
    }
}
