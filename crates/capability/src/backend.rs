use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{CapabilityOutput, CompositionOutput, ConfigMap, OutputShape, SpanExtraction};

/// The language-model collaborator. One `execute` + `parse` pair is one
/// logical batched call; internal batching and retry policy belong to the
/// backend, not to the execution engine.
pub trait LlmBackend {
    fn execute(
        &self,
        prompts: &[String],
        output_shape: OutputShape,
        batch_size: usize,
        config: &ConfigMap,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Parse raw responses into typed outputs, order-preserving. A response
    /// that fails to parse becomes `None` so the rest of the batch survives.
    fn parse(&self, output_shape: OutputShape, raw: &[String]) -> Vec<Option<CapabilityOutput>> {
        raw.iter().map(|r| parse_response(output_shape, r)).collect()
    }
}

fn parse_response(output_shape: OutputShape, raw: &str) -> Option<CapabilityOutput> {
    let parsed = match output_shape {
        OutputShape::Spans => {
            serde_json::from_str::<SpanExtraction>(raw).map(CapabilityOutput::Spans)
        }
        OutputShape::Composition => {
            serde_json::from_str::<CompositionOutput>(raw).map(CapabilityOutput::Composition)
        }
    };

    match parsed {
        Ok(output) => Some(output),
        Err(e) => {
            warn!(shape = ?output_shape, error = %e, "failed to parse backend response");
            None
        }
    }
}

#[derive(Clone)]
pub struct OllamaBackend {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str, // "json" for structured output
    #[serde(skip_serializing_if = "ConfigMap::is_empty")]
    options: ConfigMap,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    async fn generate(&self, prompt: &str, config: &ConfigMap) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json", // Force JSON output
            options: config.clone(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new("http://localhost:11434".to_string(), "llama3".to_string())
    }
}

impl LlmBackend for OllamaBackend {
    async fn execute(
        &self,
        prompts: &[String],
        _output_shape: OutputShape,
        batch_size: usize,
        config: &ConfigMap,
    ) -> Result<Vec<String>> {
        let mut raw = Vec::with_capacity(prompts.len());

        for chunk in prompts.chunks(batch_size.max(1)) {
            for prompt in chunk {
                raw.push(self.generate(prompt, config).await?);
            }
            debug!(completed = raw.len(), total = prompts.len(), "ollama batch progress");
        }

        Ok(raw)
    }
}

/// Scripted backend for tests and offline runs: pops one canned response per
/// prompt, in order; an exhausted script yields empty strings, which fail to
/// parse and surface as `None`.
#[derive(Default)]
pub struct MockBackend {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push_response(&self, response: impl Into<String>) {
        // test support: panic on a poisoned queue rather than drop the push
        self.responses
            .lock()
            .expect("mock backend response queue poisoned")
            .push_back(response.into());
    }

    /// Number of `execute` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LlmBackend for MockBackend {
    async fn execute(
        &self,
        prompts: &[String],
        _output_shape: OutputShape,
        _batch_size: usize,
        _config: &ConfigMap,
    ) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut queue = self
            .responses
            .lock()
            .map_err(|_| anyhow::anyhow!("mock backend response queue poisoned"))?;

        Ok(prompts
            .iter()
            .map(|_| queue.pop_front().unwrap_or_default())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_maps_bad_json_to_none() {
        let backend = MockBackend::default();
        let raw = vec![
            r#"{"has_labels": false, "classification": "neutral"}"#.to_string(),
            "not json".to_string(),
        ];

        let outputs = backend.parse(OutputShape::Spans, &raw);
        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].is_some());
        assert!(outputs[1].is_none());
    }

    #[test]
    fn parse_composition_shape() {
        let backend = MockBackend::default();
        let raw = vec![r#"{"composed_text": "hello", "coherence_notes": "n"}"#.to_string()];

        let outputs = backend.parse(OutputShape::Composition, &raw);
        let composed = outputs[0].as_ref().unwrap().as_composition().unwrap();
        assert_eq!(composed.composed_text, "hello");
    }

    #[tokio::test]
    async fn pushed_responses_are_served() {
        let backend = MockBackend::default();
        backend.push_response(r#"{"composed_text": "late addition"}"#);

        let prompts = vec!["p".to_string()];
        let raw = backend
            .execute(&prompts, OutputShape::Composition, 25, &ConfigMap::new())
            .await
            .unwrap();
        assert_eq!(raw[0], r#"{"composed_text": "late addition"}"#);
    }

    #[tokio::test]
    async fn mock_backend_pops_in_order() {
        let backend = MockBackend::new(vec!["a".into(), "b".into()]);
        let prompts = vec!["p1".to_string(), "p2".to_string(), "p3".to_string()];

        let raw = backend
            .execute(&prompts, OutputShape::Spans, 25, &ConfigMap::new())
            .await
            .unwrap();

        assert_eq!(raw, vec!["a".to_string(), "b".to_string(), String::new()]);
        assert_eq!(backend.call_count(), 1);
    }
}
