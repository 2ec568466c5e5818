pub mod reader;
pub mod record;

pub use reader::{ReaderOptions, load_records};
pub use record::{TextRecord, records_from_strings};
