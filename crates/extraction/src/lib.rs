pub mod models;
pub mod runner;

pub use models::{ExtractedText, ExtractionBatch, Source, load_json, new_batch_id, save_json};
pub use runner::run_extraction;
