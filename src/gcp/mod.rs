// file: src/gcp/mod.rs
// description: Google Cloud service clients module exports
// reference: internal module structure

pub mod firestore;
pub mod script;
pub mod storage;
pub mod vertex;
pub mod vision;

pub use firestore::{FirestoreClient, IndexStore};
pub use script::{AppsScriptClient, ScriptOutcome, ScriptRunner};
pub use storage::{GcsClient, ObjectStore};
pub use vertex::{OnlinePrediction, VertexClient};
pub use vision::{TextDetector, VisionClient};
