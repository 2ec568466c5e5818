use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat key/value configuration, merged shallowly (override wins per key).
pub type ConfigMap = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputShape {
    Text,
    ExcerptSet,
}

impl InputShape {
    pub fn name(&self) -> &'static str {
        match self {
            InputShape::Text => "text",
            InputShape::ExcerptSet => "excerpt_set",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    Spans,
    Composition,
}

/// Single-field text input for extraction capabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: ConfigMap,
}

impl TextInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_id(text: impl Into<String>, text_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            text_id: Some(text_id.into()),
            metadata: Map::new(),
        }
    }
}

/// A set of excerpts selected for composition. The three source lists are
/// parallel and equal in length; `target_labels` records the label
/// combination the composed text is meant to exhibit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcerptSet {
    pub excerpts: Vec<String>,
    pub source_labels: Vec<String>,
    #[serde(default)]
    pub source_text_ids: Vec<String>,
    #[serde(default)]
    pub target_labels: Vec<String>,
}

/// An input already coerced to a capability's input shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityInput {
    Text(TextInput),
    ExcerptSet(ExcerptSet),
}

impl CapabilityInput {
    pub fn shape(&self) -> InputShape {
        match self {
            CapabilityInput::Text(_) => InputShape::Text,
            CapabilityInput::ExcerptSet(_) => InputShape::ExcerptSet,
        }
    }
}

/// One labeled excerpt inside an extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSpan {
    pub excerpt: String,
    pub label: String,
    #[serde(default)]
    pub reasoning: String,
    /// Capability-specific fields (severity, paraphrase, ...).
    #[serde(default, flatten)]
    pub extra: ConfigMap,
}

/// Structured output of an extraction capability for one text.
///
/// Either `has_labels` is true and `spans` carries the labeled excerpts, or
/// the text falls under a single negative `classification`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanExtraction {
    pub has_labels: bool,
    #[serde(default)]
    pub spans: Vec<LabeledSpan>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub classification_reasoning: String,
}

impl SpanExtraction {
    /// Labels carried by positive spans; empty when `has_labels` is false.
    pub fn positive_labels(&self) -> BTreeSet<String> {
        if !self.has_labels {
            return BTreeSet::new();
        }
        self.spans.iter().map(|s| s.label.clone()).collect()
    }
}

/// Structured output of the composition capability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositionOutput {
    pub composed_text: String,
    #[serde(default)]
    pub coherence_notes: String,
}

/// A parsed backend response, tagged with its output shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityOutput {
    Spans(SpanExtraction),
    Composition(CompositionOutput),
}

impl CapabilityOutput {
    pub fn as_spans(&self) -> Option<&SpanExtraction> {
        match self {
            CapabilityOutput::Spans(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_composition(&self) -> Option<&CompositionOutput> {
        match self {
            CapabilityOutput::Composition(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_labels_empty_when_flag_unset() {
        let result = SpanExtraction {
            has_labels: false,
            spans: vec![LabeledSpan {
                excerpt: "stale".into(),
                label: "fraud".into(),
                reasoning: String::new(),
                extra: Map::new(),
            }],
            classification: Some("neutral".into()),
            classification_reasoning: String::new(),
        };
        assert!(result.positive_labels().is_empty());
    }

    #[test]
    fn span_extra_fields_round_trip() {
        let json = r#"{
            "has_labels": true,
            "spans": [{"excerpt": "x", "label": "fraud", "reasoning": "r", "severity": "high"}]
        }"#;
        let parsed: SpanExtraction = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.spans[0].extra["severity"], "high");

        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back["spans"][0]["severity"], "high");
    }
}
