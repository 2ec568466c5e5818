use anyhow::Result;
use capability::{ConfigMap, Engine, ExcerptSet, LlmBackend, RunInput, builtin};
use chrono::Utc;
use extraction::new_batch_id;
use tracing::info;

use crate::models::{SyntheticBatch, SyntheticText};

/// Compose each excerpt set into a synthetic text via the `composition`
/// capability.
///
/// Outputs are paired positionally with their originating sets to fill the
/// provenance fields; sets whose backend output failed to parse are
/// dropped. An empty input returns an empty batch without touching the
/// backend.
pub async fn run_composition<B: LlmBackend>(
    engine: &Engine<B>,
    excerpt_sets: Vec<ExcerptSet>,
    config_overrides: Option<&ConfigMap>,
    batch_size: usize,
) -> Result<SyntheticBatch> {
    let now = Utc::now();
    let batch_id = new_batch_id("synthetic");

    if excerpt_sets.is_empty() {
        info!("no excerpt sets to compose");
        return Ok(SyntheticBatch {
            batch_id,
            texts: vec![],
            source_excerpt_bank: None,
            created_at: now,
        });
    }

    let inputs: Vec<RunInput> = excerpt_sets.iter().cloned().map(RunInput::from).collect();
    let outputs = engine
        .run(builtin::COMPOSITION, inputs, config_overrides, batch_size)
        .await?;

    let mut texts = Vec::new();
    for (set, output) in excerpt_sets.into_iter().zip(outputs) {
        let Some(output) = output else { continue };
        let Some(composed) = output.as_composition() else { continue };

        texts.push(SyntheticText {
            text_id: format!("synthetic_{:04}", texts.len() + 1),
            text: composed.composed_text.clone(),
            source_excerpts: set.excerpts,
            source_labels: set.source_labels,
            source_text_ids: set.source_text_ids,
            target_labels: set.target_labels,
            coherence_notes: composed.coherence_notes.clone(),
            created_at: now,
        });
    }

    info!(batch_id = %batch_id, composed = texts.len(), "composition finished");

    Ok(SyntheticBatch {
        batch_id,
        texts,
        source_excerpt_bank: None,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use capability::{MockBackend, Registry, register_builtins};
    use std::sync::Arc;

    fn test_engine(responses: Vec<String>) -> Engine<MockBackend> {
        let mut registry = Registry::new();
        register_builtins(&mut registry).unwrap();
        Engine::new(Arc::new(registry), MockBackend::new(responses))
    }

    fn set(excerpt: &str, label: &str, source: &str) -> ExcerptSet {
        ExcerptSet {
            excerpts: vec![excerpt.to_string()],
            source_labels: vec![label.to_string()],
            source_text_ids: vec![source.to_string()],
            target_labels: vec![label.to_string()],
        }
    }

    #[tokio::test]
    async fn empty_input_skips_the_backend() {
        let engine = test_engine(vec![]);
        let batch = run_composition(&engine, vec![], None, 25).await.unwrap();

        assert!(batch.texts.is_empty());
        assert_eq!(engine.backend().call_count(), 0);
    }

    #[tokio::test]
    async fn provenance_pairs_with_originating_set_and_nulls_drop() {
        let engine = test_engine(vec![
            r#"{"composed_text": "first composed", "coherence_notes": "n1"}"#.into(),
            "broken".into(),
            r#"{"composed_text": "third composed"}"#.into(),
        ]);

        let sets = vec![
            set("cooked the books", "fraud", "t1"),
            set("swore at me", "profanity", "t4"),
            set("hire more staff", "add_or_increase", "t3"),
        ];

        let batch = run_composition(&engine, sets, None, 25).await.unwrap();

        assert_eq!(batch.texts.len(), 2);
        assert_eq!(batch.texts[0].text_id, "synthetic_0001");
        assert_eq!(batch.texts[0].text, "first composed");
        assert_eq!(batch.texts[0].source_text_ids, vec!["t1".to_string()]);
        // the dropped middle set leaves no gap in ids, and provenance still
        // tracks the originating set
        assert_eq!(batch.texts[1].text_id, "synthetic_0002");
        assert_eq!(batch.texts[1].target_labels, vec!["add_or_increase".to_string()]);
        assert_eq!(engine.backend().call_count(), 1);
    }
}
