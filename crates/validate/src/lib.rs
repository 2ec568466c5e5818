pub mod matcher;
pub mod models;
pub mod runner;

pub use matcher::LabelMatch;
pub use models::{MissedLabel, ValidatedText, ValidationBatch, ValidationSummary};
pub use runner::run_validation;
