pub mod store;

pub use store::{ExcerptBank, ExcerptReference};
