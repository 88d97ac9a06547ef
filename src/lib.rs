// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod controller;
pub mod error;
pub mod exporter;
pub mod gcp;
pub mod indexer;
pub mod models;
pub mod pipeline;
pub mod utils;

pub use config::{AuthConfig, Config, IndexConfig, ScriptConfig, StorageConfig, VertexConfig};
pub use controller::{ParseController, ParseSummary, PollPolicy};
pub use error::{HarvestError, Result};
pub use exporter::{ExportManifest, JsonExporter};
pub use gcp::{
    AppsScriptClient, FirestoreClient, GcsClient, IndexStore, ObjectStore, OnlinePrediction,
    ScriptOutcome, ScriptRunner, TextDetector, VertexClient, VisionClient,
};
pub use indexer::{
    ConsistencyReport, MergeSemantics, TopWord, WordImageIndex, normalize_and_filter,
};
pub use models::{Classification, ImageObject};
pub use pipeline::{
    CollectStats, DiagramCollector, ManifestBuilder, ManifestKind, PipelineStats,
    ProgressTracker, TextIndexer,
};
pub use utils::{HealthCheck, HealthReport, HealthStatus, OperationTimer, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _config = Config::default_config();
        let _index = WordImageIndex::new();
    }
}
