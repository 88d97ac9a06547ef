// file: src/pipeline/mod.rs
// description: harvest pipeline stage module exports
// reference: internal module structure

pub mod collect;
pub mod indexing;
pub mod manifest;
pub mod progress;

#[cfg(test)]
pub(crate) mod fakes;

pub use collect::{CollectStats, DiagramCollector};
pub use indexing::TextIndexer;
pub use manifest::{ManifestBuilder, ManifestKind, ManifestSummary};
pub use progress::{PipelineStats, ProgressTracker};
