use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use extraction::{ExtractionBatch, load_json, save_json};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// One labeled excerpt with a back-reference to its source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcerptReference {
    pub excerpt: String,
    pub source_text_id: String,
    pub capability: String,
    pub label: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, serde_json::Value>,
}

/// Label-centric index over a batch of extraction results.
///
/// Built in one pass over an `ExtractionBatch` and read-only afterwards;
/// bank construction is a barrier before any sampling starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcerptBank {
    /// label -> excerpts exhibiting it, in batch order.
    #[serde(default)]
    pub label_index: BTreeMap<String, Vec<ExcerptReference>>,
    /// negative classification -> text ids, in batch order.
    #[serde(default)]
    pub negative_index: BTreeMap<String, Vec<String>>,
    /// text id -> union of positive labels across capabilities, for
    /// co-occurrence queries.
    #[serde(default)]
    pub text_labels: BTreeMap<String, BTreeSet<String>>,
    pub built_at: DateTime<Utc>,
    #[serde(default)]
    pub source_batch_ids: Vec<String>,
}

impl ExcerptBank {
    pub fn from_batch(batch: &ExtractionBatch) -> Self {
        let mut bank = ExcerptBank {
            label_index: BTreeMap::new(),
            negative_index: BTreeMap::new(),
            text_labels: BTreeMap::new(),
            built_at: Utc::now(),
            source_batch_ids: vec![batch.batch_id.clone()],
        };

        for text in &batch.texts {
            for (capability_name, result) in &text.results {
                if result.has_labels {
                    for span in &result.spans {
                        if span.excerpt.is_empty() || span.label.is_empty() {
                            continue;
                        }
                        bank.label_index.entry(span.label.clone()).or_default().push(
                            ExcerptReference {
                                excerpt: span.excerpt.clone(),
                                source_text_id: text.text_id.clone(),
                                capability: capability_name.clone(),
                                label: span.label.clone(),
                                reasoning: span.reasoning.clone(),
                                extra: span.extra.clone(),
                            },
                        );
                        bank.text_labels
                            .entry(text.text_id.clone())
                            .or_default()
                            .insert(span.label.clone());
                    }
                } else if let Some(classification) = &result.classification {
                    bank.negative_index
                        .entry(classification.clone())
                        .or_default()
                        .push(text.text_id.clone());
                }
            }
        }

        bank
    }

    /// All excerpts under a label, in insertion order. Empty for an unknown
    /// label.
    pub fn bucket(&self, label: &str) -> &[ExcerptReference] {
        self.label_index.get(label).map_or(&[], Vec::as_slice)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label_index.contains_key(label)
    }

    pub fn available_labels(&self) -> Vec<String> {
        self.label_index.keys().cloned().collect()
    }

    pub fn available_classifications(&self) -> Vec<String> {
        self.negative_index.keys().cloned().collect()
    }

    pub fn counts_by_label(&self) -> BTreeMap<String, usize> {
        self.label_index
            .iter()
            .map(|(label, refs)| (label.clone(), refs.len()))
            .collect()
    }

    pub fn counts_by_classification(&self) -> BTreeMap<String, usize> {
        self.negative_index
            .iter()
            .map(|(classification, ids)| (classification.clone(), ids.len()))
            .collect()
    }

    /// Excerpts for one label: first `n` in insertion order, or a uniform
    /// random subset of size `n` when `random` is set.
    pub fn excerpts_for(&self, label: &str, n: Option<usize>, random: bool) -> Vec<ExcerptReference> {
        let bucket = self.bucket(label);
        match n {
            Some(n) if random => {
                let mut rng = rand::thread_rng();
                bucket
                    .choose_multiple(&mut rng, n.min(bucket.len()))
                    .cloned()
                    .collect()
            }
            Some(n) => bucket.iter().take(n).cloned().collect(),
            None => bucket.to_vec(),
        }
    }

    pub fn excerpts_for_many(
        &self,
        labels: &[String],
        n_per_label: usize,
        random: bool,
    ) -> BTreeMap<String, Vec<ExcerptReference>> {
        labels
            .iter()
            .map(|label| (label.clone(), self.excerpts_for(label, Some(n_per_label), random)))
            .collect()
    }

    /// Ids of texts filed under a negative classification.
    pub fn texts_for_classification(
        &self,
        classification: &str,
        n: Option<usize>,
        random: bool,
    ) -> Vec<String> {
        let ids = self
            .negative_index
            .get(classification)
            .map_or(&[][..], Vec::as_slice);
        match n {
            Some(n) if random => {
                let mut rng = rand::thread_rng();
                ids.choose_multiple(&mut rng, n.min(ids.len())).cloned().collect()
            }
            Some(n) => ids.iter().take(n).cloned().collect(),
            None => ids.to_vec(),
        }
    }

    /// Number of texts whose extracted labels include both `a` and `b`.
    /// Symmetric; the diagonal is the number of texts carrying the label.
    pub fn cooccurrence(&self, a: &str, b: &str) -> usize {
        self.text_labels
            .values()
            .filter(|labels| labels.contains(a) && labels.contains(b))
            .count()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::{LabeledSpan, SpanExtraction};
    use extraction::{ExtractedText, Source};

    fn span(excerpt: &str, label: &str) -> LabeledSpan {
        LabeledSpan {
            excerpt: excerpt.to_string(),
            label: label.to_string(),
            reasoning: String::new(),
            extra: Map::new(),
        }
    }

    fn positive(spans: Vec<LabeledSpan>) -> SpanExtraction {
        SpanExtraction {
            has_labels: true,
            spans,
            classification: None,
            classification_reasoning: String::new(),
        }
    }

    fn negative(classification: &str) -> SpanExtraction {
        SpanExtraction {
            has_labels: false,
            spans: vec![],
            classification: Some(classification.to_string()),
            classification_reasoning: String::new(),
        }
    }

    fn text(id: &str, results: Vec<(&str, SpanExtraction)>) -> ExtractedText {
        ExtractedText {
            text_id: id.to_string(),
            text: format!("source text {id}"),
            results: results
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            source: Source::Organic,
            capabilities_applied: vec!["alerts".into()],
            processed_at: Utc::now(),
        }
    }

    fn sample_batch() -> ExtractionBatch {
        ExtractionBatch {
            batch_id: "batch_test".into(),
            texts: vec![
                text(
                    "t1",
                    vec![(
                        "alerts",
                        positive(vec![span("cooked the books", "fraud"), span("swore at me", "profanity")]),
                    )],
                ),
                text("t2", vec![("alerts", positive(vec![span("fake invoices", "fraud")]))]),
                text(
                    "t3",
                    vec![
                        ("alerts", negative("neutral")),
                        ("recommendations", positive(vec![span("hire more staff", "add_or_increase")])),
                    ],
                ),
            ],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn build_indexes_positive_and_negative_results() {
        let bank = ExcerptBank::from_batch(&sample_batch());

        assert_eq!(
            bank.available_labels(),
            vec!["add_or_increase".to_string(), "fraud".to_string(), "profanity".to_string()]
        );
        assert_eq!(bank.counts_by_label()["fraud"], 2);
        assert_eq!(bank.counts_by_classification()["neutral"], 1);
        // t3 legally sits in both indexes: alerts said negative,
        // recommendations found a span
        assert!(bank.text_labels.contains_key("t3"));
        assert_eq!(bank.texts_for_classification("neutral", None, false), vec!["t3".to_string()]);
    }

    #[test]
    fn counts_sum_to_total_positive_spans() {
        let bank = ExcerptBank::from_batch(&sample_batch());
        let total: usize = bank.counts_by_label().values().sum();
        assert_eq!(total, 4);

        for (label, refs) in &bank.label_index {
            assert!(refs.iter().all(|r| &r.label == label));
        }
    }

    #[test]
    fn cooccurrence_is_symmetric_with_diagonal() {
        let bank = ExcerptBank::from_batch(&sample_batch());

        assert_eq!(bank.cooccurrence("fraud", "profanity"), 1); // only t1
        assert_eq!(bank.cooccurrence("profanity", "fraud"), 1);
        assert_eq!(bank.cooccurrence("fraud", "fraud"), 2); // t1 and t2
        assert_eq!(bank.cooccurrence("fraud", "add_or_increase"), 0);
    }

    #[test]
    fn excerpts_for_respects_limit_and_order() {
        let bank = ExcerptBank::from_batch(&sample_batch());

        let first = bank.excerpts_for("fraud", Some(1), false);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].excerpt, "cooked the books");

        let random = bank.excerpts_for("fraud", Some(10), true);
        assert_eq!(random.len(), 2);

        assert!(bank.excerpts_for("unknown", None, false).is_empty());
    }

    #[test]
    fn save_load_round_trip() {
        let bank = ExcerptBank::from_batch(&sample_batch());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.json");

        bank.save(&path).unwrap();
        let loaded = ExcerptBank::load(&path).unwrap();
        assert_eq!(bank, loaded);
    }
}
