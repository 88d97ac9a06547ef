// file: src/indexer/mod.rs
// description: word-image indexing module exports
// reference: internal module structure

pub mod index;
pub mod words;

pub use index::{ConsistencyReport, MergeSemantics, TopWord, Violation, WordImageIndex};
pub use words::{is_word, normalize_and_filter};
