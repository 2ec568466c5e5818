use std::collections::BTreeMap;

use anyhow::Result;
use capability::{Engine, LlmBackend, RunInput, SpanExtraction, TextInput};
use chrono::Utc;
use ingest::TextRecord;
use tracing::info;

use crate::models::{ExtractedText, ExtractionBatch, Source, new_batch_id};

/// Run every named extraction capability over a batch of records and
/// aggregate the results per text.
///
/// A per-item backend failure leaves that capability absent from the text's
/// result map; only structural misuse (unknown capability name) fails the
/// whole run.
pub async fn run_extraction<B: LlmBackend>(
    engine: &Engine<B>,
    records: &[TextRecord],
    capabilities: &[&str],
    config_overrides: Option<&capability::ConfigMap>,
    batch_size: usize,
    source: Source,
) -> Result<ExtractionBatch> {
    let mut results_by_id: BTreeMap<String, BTreeMap<String, SpanExtraction>> = records
        .iter()
        .map(|r| (r.text_id.clone(), BTreeMap::new()))
        .collect();

    for &capability_name in capabilities {
        let inputs: Vec<RunInput> = records
            .iter()
            .map(|r| TextInput::with_id(r.text.clone(), r.text_id.clone()).into())
            .collect();

        let outputs = engine
            .run(capability_name, inputs, config_overrides, batch_size)
            .await?;

        let parsed = outputs.iter().filter(|o| o.is_some()).count();
        info!(
            capability = capability_name,
            texts = records.len(),
            parsed,
            "extraction capability finished"
        );

        for (record, output) in records.iter().zip(outputs) {
            let Some(output) = output else { continue };
            if let Some(spans) = output.as_spans() {
                if let Some(per_text) = results_by_id.get_mut(&record.text_id) {
                    per_text.insert(capability_name.to_string(), spans.clone());
                }
            }
        }
    }

    let applied: Vec<String> = capabilities.iter().map(|c| c.to_string()).collect();
    let now = Utc::now();

    Ok(ExtractionBatch {
        batch_id: new_batch_id("batch"),
        texts: records
            .iter()
            .map(|r| ExtractedText {
                text_id: r.text_id.clone(),
                text: r.text.clone(),
                results: results_by_id.remove(&r.text_id).unwrap_or_default(),
                source,
                capabilities_applied: applied.clone(),
                processed_at: now,
            })
            .collect(),
        created_at: now,
    })
}
