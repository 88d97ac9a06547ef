// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Object storage error: {0}")]
    Storage(String),

    #[error("Vision API error: {0}")]
    Vision(String),

    #[error("Prediction service error: {0}")]
    Prediction(String),

    #[error("Document store error: {0}")]
    DocStore(String),

    #[error("Script execution error: {0}")]
    ScriptRun(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
