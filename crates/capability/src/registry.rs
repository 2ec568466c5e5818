use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use anyhow::Result;

use crate::error::CapabilityError;
use crate::types::{CapabilityInput, ConfigMap, InputShape, OutputShape};

/// Prompt construction function for a capability.
///
/// The text input shape hands the prompt function the raw text; every other
/// shape hands it the full coerced input. Keeping the two cases as separate
/// variants lets the registry reject a mismatched pairing at registration
/// instead of at dispatch time.
#[derive(Debug, Clone, Copy)]
pub enum PromptFn {
    Text(fn(&str) -> String),
    Structured(fn(&CapabilityInput) -> String),
}

/// A registered unit of work: input/output contract plus prompt builder.
/// Immutable once registered.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub category: String,
    pub input_shape: InputShape,
    pub output_shape: OutputShape,
    pub prompt_fn: PromptFn,
    pub default_config: ConfigMap,
}

impl Capability {
    /// Build the prompt for an input already coerced to this capability's
    /// input shape.
    pub fn build_prompt(&self, input: &CapabilityInput) -> String {
        match (&self.prompt_fn, input) {
            (PromptFn::Text(f), CapabilityInput::Text(t)) => f(&t.text),
            (PromptFn::Structured(f), input) => f(input),
            // register() rejects a text prompt fn paired with any other shape
            (PromptFn::Text(_), _) => unreachable!("prompt fn / input shape mismatch"),
        }
    }
}

/// Name-keyed capability registry. Populated once at startup by explicit
/// `register` calls; entries are never removed or replaced.
#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<String, Capability>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Capability) -> Result<(), CapabilityError> {
        if capability.name.trim().is_empty() {
            return Err(CapabilityError::Malformed {
                name: capability.name.clone(),
                reason: "name must be non-empty".into(),
            });
        }

        let prompt_matches_shape = match (capability.input_shape, &capability.prompt_fn) {
            (InputShape::Text, PromptFn::Text(_)) => true,
            (InputShape::Text, PromptFn::Structured(_)) => false,
            (_, PromptFn::Structured(_)) => true,
            (_, PromptFn::Text(_)) => false,
        };
        if !prompt_matches_shape {
            return Err(CapabilityError::Malformed {
                name: capability.name.clone(),
                reason: format!(
                    "prompt function variant does not match the '{}' input shape",
                    capability.input_shape.name()
                ),
            });
        }

        if self.entries.contains_key(&capability.name) {
            return Err(CapabilityError::Duplicate {
                name: capability.name,
            });
        }

        self.entries.insert(capability.name.clone(), capability);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&Capability, CapabilityError> {
        self.entries
            .get(name)
            .ok_or_else(|| CapabilityError::Unknown {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Registered capability names, optionally filtered by category.
    pub fn list(&self, category: Option<&str>) -> Vec<String> {
        self.entries
            .values()
            .filter(|c| category.is_none_or(|cat| c.category == cat))
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

/// Install the process-wide registry. Called once at startup, after all
/// registrations; a second call is a startup bug.
pub fn install(registry: Arc<Registry>) -> Result<()> {
    GLOBAL
        .set(registry)
        .map_err(|_| anyhow::anyhow!("global capability registry already installed"))
}

/// The process-wide registry, if one has been installed.
pub fn global() -> Option<Arc<Registry>> {
    GLOBAL.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;

    fn text_prompt(text: &str) -> String {
        format!("prompt: {text}")
    }

    fn structured_prompt(_input: &CapabilityInput) -> String {
        "structured".to_string()
    }

    fn text_capability(name: &str, category: &str) -> Capability {
        Capability {
            name: name.to_string(),
            category: category.to_string(),
            input_shape: InputShape::Text,
            output_shape: OutputShape::Spans,
            prompt_fn: PromptFn::Text(text_prompt),
            default_config: ConfigMap::new(),
        }
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = Registry::new();
        registry.register(text_capability("alerts", "extraction")).unwrap();

        let cap = registry.resolve("alerts").unwrap();
        assert_eq!(cap.input_shape, InputShape::Text);
        assert_eq!(cap.output_shape, OutputShape::Spans);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = Registry::new();
        registry.register(text_capability("alerts", "extraction")).unwrap();

        let err = registry
            .register(text_capability("alerts", "extraction"))
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Duplicate { name } if name == "alerts"));
    }

    #[test]
    fn empty_name_is_malformed() {
        let mut registry = Registry::new();
        let err = registry.register(text_capability("  ", "extraction")).unwrap_err();
        assert!(matches!(err, CapabilityError::Malformed { .. }));
    }

    #[test]
    fn mismatched_prompt_fn_is_malformed() {
        let mut registry = Registry::new();
        let mut cap = text_capability("compose", "generation");
        cap.input_shape = InputShape::ExcerptSet;
        // still PromptFn::Text, which only fits the text shape

        let err = registry.register(cap).unwrap_err();
        assert!(matches!(err, CapabilityError::Malformed { .. }));
    }

    #[test]
    fn unknown_capability_lists_registered_names() {
        let mut registry = Registry::new();
        registry.register(text_capability("alerts", "extraction")).unwrap();

        let err = registry.resolve("missing").unwrap_err();
        match err {
            CapabilityError::Unknown { name, available } => {
                assert_eq!(name, "missing");
                assert_eq!(available, vec!["alerts".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // The global registry is process-wide state, so the double-install
    // check has to live in a single test.
    #[test]
    fn global_install_is_one_shot() {
        let mut registry = Registry::new();
        registry.register(text_capability("alerts", "extraction")).unwrap();
        let registry = Arc::new(registry);

        install(registry.clone()).unwrap();
        assert!(global().is_some_and(|r| !r.is_empty()));
        assert!(install(registry).is_err());
    }

    #[test]
    fn list_filters_by_category() {
        let mut registry = Registry::new();
        registry.register(text_capability("alerts", "extraction")).unwrap();
        registry
            .register(text_capability("recommendations", "extraction"))
            .unwrap();

        let mut compose = text_capability("composition", "generation");
        compose.input_shape = InputShape::ExcerptSet;
        compose.output_shape = OutputShape::Composition;
        compose.prompt_fn = PromptFn::Structured(structured_prompt);
        registry.register(compose).unwrap();

        assert_eq!(registry.list(None).len(), 3);
        assert_eq!(
            registry.list(Some("extraction")),
            vec!["alerts".to_string(), "recommendations".to_string()]
        );
        assert_eq!(registry.list(Some("generation")), vec!["composition".to_string()]);
    }
}
