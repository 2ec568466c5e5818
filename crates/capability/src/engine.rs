use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::backend::LlmBackend;
use crate::error::CapabilityError;
use crate::registry::{Capability, Registry};
use crate::types::{
    CapabilityInput, CapabilityOutput, ConfigMap, ExcerptSet, InputShape, TextInput,
};

/// An input as supplied by a caller, before coercion to the capability's
/// input shape. Bare strings are only accepted by the text shape.
#[derive(Debug, Clone)]
pub enum RunInput {
    Raw(String),
    Value(Value),
    Typed(CapabilityInput),
}

impl From<String> for RunInput {
    fn from(text: String) -> Self {
        RunInput::Raw(text)
    }
}

impl From<&str> for RunInput {
    fn from(text: &str) -> Self {
        RunInput::Raw(text.to_string())
    }
}

impl From<Value> for RunInput {
    fn from(value: Value) -> Self {
        RunInput::Value(value)
    }
}

impl From<CapabilityInput> for RunInput {
    fn from(input: CapabilityInput) -> Self {
        RunInput::Typed(input)
    }
}

impl From<TextInput> for RunInput {
    fn from(input: TextInput) -> Self {
        RunInput::Typed(CapabilityInput::Text(input))
    }
}

impl From<ExcerptSet> for RunInput {
    fn from(set: ExcerptSet) -> Self {
        RunInput::Typed(CapabilityInput::ExcerptSet(set))
    }
}

/// Resolves capabilities, coerces inputs, builds prompts, and dispatches one
/// batched call to the backend per invocation.
pub struct Engine<B: LlmBackend> {
    registry: Arc<Registry>,
    backend: B,
}

impl<B: LlmBackend> Engine<B> {
    pub fn new(registry: Arc<Registry>, backend: B) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run a capability over a batch of inputs.
    ///
    /// The result vector is order-preserving and the same length as
    /// `inputs`; a `None` entry means the backend response for that item
    /// failed to parse. Structural problems (unknown capability, an input
    /// the capability cannot accept) fail the whole call instead.
    pub async fn run(
        &self,
        capability: &str,
        inputs: Vec<RunInput>,
        config_overrides: Option<&ConfigMap>,
        batch_size: usize,
    ) -> Result<Vec<Option<CapabilityOutput>>> {
        let cap = self.registry.resolve(capability)?;

        let coerced = inputs
            .into_iter()
            .map(|input| coerce_input(cap, input))
            .collect::<Result<Vec<_>, CapabilityError>>()?;

        let prompts: Vec<String> = coerced.iter().map(|input| cap.build_prompt(input)).collect();
        let config = merged_config(cap, config_overrides);

        debug!(
            capability = %cap.name,
            prompts = prompts.len(),
            batch_size,
            "dispatching capability batch"
        );

        let raw = self
            .backend
            .execute(&prompts, cap.output_shape, batch_size, &config)
            .await
            .with_context(|| format!("backend dispatch failed for capability '{}'", cap.name))?;

        Ok(self.backend.parse(cap.output_shape, &raw))
    }
}

fn coerce_input(cap: &Capability, input: RunInput) -> Result<CapabilityInput, CapabilityError> {
    match (cap.input_shape, input) {
        (InputShape::Text, RunInput::Raw(text)) => Ok(CapabilityInput::Text(TextInput::new(text))),
        (shape, RunInput::Raw(_)) => Err(CapabilityError::InputShape {
            capability: cap.name.clone(),
            expected: shape.name(),
            got: "raw string".to_string(),
        }),
        (InputShape::Text, RunInput::Value(value)) => serde_json::from_value::<TextInput>(value)
            .map(CapabilityInput::Text)
            .map_err(|e| CapabilityError::InputShape {
                capability: cap.name.clone(),
                expected: InputShape::Text.name(),
                got: format!("mapping ({e})"),
            }),
        (InputShape::ExcerptSet, RunInput::Value(value)) => {
            serde_json::from_value::<ExcerptSet>(value)
                .map(CapabilityInput::ExcerptSet)
                .map_err(|e| CapabilityError::InputShape {
                    capability: cap.name.clone(),
                    expected: InputShape::ExcerptSet.name(),
                    got: format!("mapping ({e})"),
                })
        }
        (shape, RunInput::Typed(typed)) => {
            if typed.shape() == shape {
                Ok(typed)
            } else {
                Err(CapabilityError::InputShape {
                    capability: cap.name.clone(),
                    expected: shape.name(),
                    got: typed.shape().name().to_string(),
                })
            }
        }
    }
}

fn merged_config(cap: &Capability, overrides: Option<&ConfigMap>) -> ConfigMap {
    let mut config = cap.default_config.clone();
    if let Some(overrides) = overrides {
        for (key, value) in overrides {
            config.insert(key.clone(), value.clone());
        }
    }
    config
}
