use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use capability::SpanExtraction;
use chrono::{DateTime, Utc};
use extraction::{load_json, save_json};
use serde::{Deserialize, Serialize};

use crate::matcher::LabelMatch;

/// A synthetic text with its re-extraction results and label agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedText {
    pub text_id: String,
    pub text: String,
    pub source_labels: Vec<String>,
    pub target_labels: Vec<String>,
    /// capability name -> re-extraction output (absent on parse failure).
    #[serde(default)]
    pub results: BTreeMap<String, SpanExtraction>,
    pub label_match: LabelMatch,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissedLabel {
    pub label: String,
    pub count: usize,
}

/// Aggregate agreement over one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub passed: usize,
    pub pass_rate: f64,
    pub mean_precision: f64,
    pub mean_recall: f64,
    pub mean_f1: f64,
    /// Up to ten most frequently missed labels, descending count, ties in
    /// first-seen order.
    pub top_missed: Vec<MissedLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationBatch {
    pub batch_id: String,
    pub source_batch_id: String,
    #[serde(default)]
    pub capabilities_used: Vec<String>,
    #[serde(default)]
    pub texts: Vec<ValidatedText>,
    pub summary: ValidationSummary,
    pub created_at: DateTime<Utc>,
}

impl ValidationBatch {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }

    pub fn passing_texts(&self) -> impl Iterator<Item = &ValidatedText> {
        self.texts.iter().filter(|t| t.passed)
    }

    pub fn failing_texts(&self) -> impl Iterator<Item = &ValidatedText> {
        self.texts.iter().filter(|t| !t.passed)
    }
}
