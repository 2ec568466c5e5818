pub mod models;
pub mod runner;

pub use models::{SyntheticBatch, SyntheticText};
pub use runner::run_composition;
