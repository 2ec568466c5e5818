use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use extraction::{load_json, save_json};
use serde::{Deserialize, Serialize};

/// A composed text with full provenance back to the excerpt set it came
/// from. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticText {
    pub text_id: String,
    pub text: String,
    pub source_excerpts: Vec<String>,
    pub source_labels: Vec<String>,
    pub source_text_ids: Vec<String>,
    pub target_labels: Vec<String>,
    #[serde(default)]
    pub coherence_notes: String,
    pub created_at: DateTime<Utc>,
}

/// Self-describing batch of synthetic texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticBatch {
    pub batch_id: String,
    #[serde(default)]
    pub texts: Vec<SyntheticText>,
    /// Path of the bank the excerpt sets were sampled from, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_excerpt_bank: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SyntheticBatch {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}
