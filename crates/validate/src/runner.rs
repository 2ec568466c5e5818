use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use capability::{ConfigMap, Engine, LlmBackend, RunInput, SpanExtraction, TextInput};
use chrono::Utc;
use compose::SyntheticBatch;
use extraction::new_batch_id;
use tracing::info;

use crate::matcher::LabelMatch;
use crate::models::{MissedLabel, ValidatedText, ValidationBatch, ValidationSummary};

/// Re-run extraction capabilities over a synthetic batch and score how well
/// the detected labels agree with each text's target labels.
///
/// The detected set is the union, across capabilities, of labels on
/// positive spans; negative classifications are excluded (they mark the
/// absence of labels). An item passes when its match ratio reaches
/// `threshold`.
pub async fn run_validation<B: LlmBackend>(
    engine: &Engine<B>,
    synthetic: &SyntheticBatch,
    capabilities: &[&str],
    threshold: f64,
    config_overrides: Option<&ConfigMap>,
    batch_size: usize,
) -> Result<ValidationBatch> {
    let mut results_per_text: Vec<BTreeMap<String, SpanExtraction>> =
        vec![BTreeMap::new(); synthetic.texts.len()];

    for &capability_name in capabilities {
        let inputs: Vec<RunInput> = synthetic
            .texts
            .iter()
            .map(|t| TextInput::with_id(t.text.clone(), t.text_id.clone()).into())
            .collect();

        let outputs = engine
            .run(capability_name, inputs, config_overrides, batch_size)
            .await?;

        for (per_text, output) in results_per_text.iter_mut().zip(outputs) {
            let Some(output) = output else { continue };
            if let Some(spans) = output.as_spans() {
                per_text.insert(capability_name.to_string(), spans.clone());
            }
        }
    }

    let mut texts = Vec::with_capacity(synthetic.texts.len());
    for (synth, results) in synthetic.texts.iter().zip(results_per_text) {
        let expected: BTreeSet<String> = synth.target_labels.iter().cloned().collect();
        let detected: BTreeSet<String> = results
            .values()
            .flat_map(|r| r.positive_labels())
            .collect();

        let label_match = LabelMatch::score(&expected, &detected);
        let passed = label_match.ratio >= threshold;

        texts.push(ValidatedText {
            text_id: synth.text_id.clone(),
            text: synth.text.clone(),
            source_labels: synth.source_labels.clone(),
            target_labels: synth.target_labels.clone(),
            results,
            label_match,
            passed,
        });
    }

    let summary = summarize(&texts);
    info!(
        total = summary.total,
        passed = summary.passed,
        pass_rate = summary.pass_rate,
        "validation finished"
    );

    Ok(ValidationBatch {
        batch_id: new_batch_id("validation"),
        source_batch_id: synthetic.batch_id.clone(),
        capabilities_used: capabilities.iter().map(|c| c.to_string()).collect(),
        texts,
        summary,
        created_at: Utc::now(),
    })
}

fn summarize(texts: &[ValidatedText]) -> ValidationSummary {
    let total = texts.len();
    let passed = texts.iter().filter(|t| t.passed).count();

    let mean = |f: fn(&LabelMatch) -> f64| -> f64 {
        if total == 0 {
            0.0
        } else {
            texts.iter().map(|t| f(&t.label_match)).sum::<f64>() / total as f64
        }
    };

    // count misses preserving first-seen order for tie-breaking
    let mut missed: Vec<(String, usize)> = Vec::new();
    for text in texts {
        for label in &text.label_match.missed {
            match missed.iter_mut().find(|(l, _)| l == label) {
                Some((_, count)) => *count += 1,
                None => missed.push((label.clone(), 1)),
            }
        }
    }
    missed.sort_by(|a, b| b.1.cmp(&a.1)); // stable sort keeps first-seen order on ties
    missed.truncate(10);

    ValidationSummary {
        total,
        passed,
        pass_rate: if total == 0 { 0.0 } else { passed as f64 / total as f64 },
        mean_precision: mean(|m| m.precision),
        mean_recall: mean(|m| m.recall),
        mean_f1: mean(|m| m.f1),
        top_missed: missed
            .into_iter()
            .map(|(label, count)| MissedLabel { label, count })
            .collect(),
    }
}
