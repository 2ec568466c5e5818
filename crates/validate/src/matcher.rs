use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Agreement between a synthetic text's intended labels and the labels
/// detected on re-extraction.
///
/// `ratio` and `recall` are the same number, `|matched| / |expected|`; both
/// are kept so existing readers of either name see the value they expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMatch {
    pub expected: BTreeSet<String>,
    pub detected: BTreeSet<String>,
    pub matched: BTreeSet<String>,
    pub missed: BTreeSet<String>,
    pub extra: BTreeSet<String>,
    pub ratio: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl LabelMatch {
    pub fn score(expected: &BTreeSet<String>, detected: &BTreeSet<String>) -> Self {
        let matched: BTreeSet<String> = expected.intersection(detected).cloned().collect();
        let missed: BTreeSet<String> = expected.difference(detected).cloned().collect();
        let extra: BTreeSet<String> = detected.difference(expected).cloned().collect();

        let recall = if expected.is_empty() {
            1.0
        } else {
            matched.len() as f64 / expected.len() as f64
        };
        let precision = if detected.is_empty() {
            0.0
        } else {
            matched.len() as f64 / detected.len() as f64
        };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Self {
            expected: expected.clone(),
            detected: detected.clone(),
            matched,
            missed,
            extra,
            ratio: recall,
            precision,
            recall,
            f1,
        }
    }
}
