pub mod backend;
pub mod builtin;
pub mod engine;
pub mod error;
pub mod prompt;
pub mod registry;
pub mod types;

pub use backend::{LlmBackend, MockBackend, OllamaBackend};
pub use builtin::register_builtins;
pub use engine::{Engine, RunInput};
pub use error::CapabilityError;
pub use registry::{Capability, PromptFn, Registry};
pub use types::{
    CapabilityInput, CapabilityOutput, CompositionOutput, ConfigMap, ExcerptSet, InputShape,
    LabeledSpan, OutputShape, SpanExtraction, TextInput,
};
