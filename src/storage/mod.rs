//! On-disk index stores, one per source root, backed by tantivy.

pub mod schema;
pub mod store;

pub use schema::{DocumentSchema, SOURCE_TOKENIZER};
pub use store::{CandidateSet, IndexStore, SourceDocument, StoreWriter, WriteMode};
