use serde_json::{Value, json};

use crate::error::CapabilityError;
use crate::prompt;
use crate::registry::{Capability, PromptFn, Registry};
use crate::types::{ConfigMap, InputShape, OutputShape};

pub const ALERTS: &str = "alerts";
pub const RECOMMENDATIONS: &str = "recommendations";
pub const COMPOSITION: &str = "composition";

pub const CATEGORY_EXTRACTION: &str = "extraction";
pub const CATEGORY_GENERATION: &str = "generation";

/// Register the built-in capabilities. This is the single startup-time
/// registration point; a duplicate or malformed entry here is a startup bug
/// and fails loudly.
pub fn register_builtins(registry: &mut Registry) -> Result<(), CapabilityError> {
    registry.register(Capability {
        name: ALERTS.to_string(),
        category: CATEGORY_EXTRACTION.to_string(),
        input_shape: InputShape::Text,
        output_shape: OutputShape::Spans,
        prompt_fn: PromptFn::Text(prompt::alerts_prompt),
        default_config: config_map(json!({
            "temperature": 0.2,
            "max_tokens": 800,
        })),
    })?;

    registry.register(Capability {
        name: RECOMMENDATIONS.to_string(),
        category: CATEGORY_EXTRACTION.to_string(),
        input_shape: InputShape::Text,
        output_shape: OutputShape::Spans,
        prompt_fn: PromptFn::Text(prompt::recommendations_prompt),
        default_config: config_map(json!({
            "temperature": 0.2,
            "max_tokens": 800,
        })),
    })?;

    registry.register(Capability {
        name: COMPOSITION.to_string(),
        category: CATEGORY_GENERATION.to_string(),
        input_shape: InputShape::ExcerptSet,
        output_shape: OutputShape::Composition,
        prompt_fn: PromptFn::Structured(prompt::composition_prompt),
        default_config: config_map(json!({
            "temperature": 0.7, // higher for more creative variation
            "max_tokens": 500,
        })),
    })?;

    Ok(())
}

fn config_map(value: Value) -> ConfigMap {
    match value {
        Value::Object(map) => map,
        _ => ConfigMap::new(),
    }
}
