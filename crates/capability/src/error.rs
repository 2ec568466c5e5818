use thiserror::Error;

/// Structural misuse of the capability layer. Everything here is fatal for
/// the call (or for startup, in the registration cases); per-item backend
/// failures are not errors and surface as `None` entries instead.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability '{name}' is already registered")]
    Duplicate { name: String },

    #[error("capability '{name}' is malformed: {reason}")]
    Malformed { name: String, reason: String },

    #[error("unknown capability '{name}'; registered capabilities: {available:?}")]
    Unknown {
        name: String,
        available: Vec<String>,
    },

    #[error("capability '{capability}' expects {expected} input, got {got}")]
    InputShape {
        capability: String,
        expected: &'static str,
        got: String,
    },
}
