// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::controller::PollPolicy;
use crate::error::{HarvestError, Result};
use crate::indexer::MergeSemantics;
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Google Cloud project owning the bucket, the models and the index.
    pub project: String,
    pub storage: StorageConfig,
    pub vertex: VertexConfig,
    pub index: IndexConfig,
    pub script: ScriptConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub bucket: String,
    /// Prefix listing the full image corpus.
    pub images_prefix: String,
    /// Prefix the collected diagrams are copied under.
    pub diagrams_prefix: String,
    /// Prefix holding batch prediction output files.
    pub predictions_prefix: String,
    /// Label the classifier assigns to architecture diagrams.
    pub diagram_label: String,
    /// Minimum confidence for that label before an image is collected.
    pub min_confidence: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VertexConfig {
    pub location: String,
    /// Deployed endpoint for online classification.
    pub endpoint_id: Option<String>,
    /// Trained model resource for batch prediction.
    pub model: Option<String>,
    #[serde(default = "VertexConfig::default_poll")]
    pub poll: PollPolicy,
}

impl VertexConfig {
    // Dataset imports and batch jobs run for minutes to hours.
    fn default_poll() -> PollPolicy {
        PollPolicy {
            base_delay_ms: 10_000,
            max_delay_ms: 300_000,
            max_attempts: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Document store collection holding both index documents.
    pub collection: String,
    pub word_document: String,
    pub image_document: String,
    #[serde(default)]
    pub merge_semantics: MergeSemantics,
    /// Default word count for the top-words report.
    pub top_words: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptConfig {
    pub script_id: String,
    pub function: String,
    /// Result string the script reports when no work remains.
    pub finished_sentinel: String,
    /// Transport timeout for one script execution call. Runs can be long.
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub poll: PollPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// OAuth2 bearer token presented to every Google API.
    pub access_token: Option<String>,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DIAGRAM_HARVEST")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| HarvestError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| HarvestError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            project: "my-project".to_string(),
            storage: StorageConfig {
                bucket: "diagram-harvest-corpus".to_string(),
                images_prefix: "images/".to_string(),
                diagrams_prefix: "diagrams".to_string(),
                predictions_prefix: "predictions/".to_string(),
                diagram_label: "arch_diagram".to_string(),
                min_confidence: 1.0,
            },
            vertex: VertexConfig {
                location: "us-central1".to_string(),
                endpoint_id: None,
                model: None,
                poll: VertexConfig::default_poll(),
            },
            index: IndexConfig {
                collection: "image_text".to_string(),
                word_document: "word_to_images".to_string(),
                image_document: "image_to_words".to_string(),
                merge_semantics: MergeSemantics::Append,
                top_words: 100,
            },
            script: ScriptConfig {
                script_id: String::new(),
                function: "doWork".to_string(),
                finished_sentinel: "No file IDs to parse.".to_string(),
                request_timeout_secs: 1_800,
                poll: PollPolicy::default(),
            },
            auth: AuthConfig { access_token: None },
        }
    }

    /// The bearer token, or a configuration error telling the operator how
    /// to supply one.
    pub fn require_token(&self) -> Result<String> {
        self.auth.access_token.clone().ok_or_else(|| {
            HarvestError::Config(
                "no access token configured; set auth.access_token or DIAGRAM_HARVEST__AUTH__ACCESS_TOKEN"
                    .to_string(),
            )
        })
    }

    fn validate(&self) -> Result<()> {
        if self.project.is_empty() {
            return Err(HarvestError::Config("project must not be empty".to_string()));
        }

        Validator::validate_bucket_name(&self.storage.bucket)?;
        Validator::validate_prefix(&self.storage.images_prefix)?;
        Validator::validate_prefix(&self.storage.diagrams_prefix)?;
        Validator::validate_prefix(&self.storage.predictions_prefix)?;

        if !(0.0..=1.0).contains(&self.storage.min_confidence) {
            return Err(HarvestError::Config(
                "min_confidence must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.storage.diagram_label.is_empty() {
            return Err(HarvestError::Config(
                "diagram_label must not be empty".to_string(),
            ));
        }

        if self.index.collection.is_empty()
            || self.index.word_document.is_empty()
            || self.index.image_document.is_empty()
        {
            return Err(HarvestError::Config(
                "index collection and document names must not be empty".to_string(),
            ));
        }

        if self.index.word_document == self.index.image_document {
            return Err(HarvestError::Config(
                "word_document and image_document must differ".to_string(),
            ));
        }

        if self.index.top_words == 0 {
            return Err(HarvestError::Config(
                "top_words must be greater than 0".to_string(),
            ));
        }

        self.script.poll.validate().map_err(|e| HarvestError::Config(e.to_string()))?;
        self.vertex.poll.validate().map_err(|e| HarvestError::Config(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_bucket_rejected() {
        let mut config = Config::default_config();
        config.storage.bucket = "NOT-A-BUCKET".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_project_rejected() {
        let mut config = Config::default_config();
        config.project = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let mut config = Config::default_config();
        config.storage.min_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_identical_document_names_rejected() {
        let mut config = Config::default_config();
        config.index.image_document = config.index.word_document.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_top_words_rejected() {
        let mut config = Config::default_config();
        config.index.top_words = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_token() {
        let mut config = Config::default_config();
        assert!(config.require_token().is_err());

        config.auth.access_token = Some("ya29.token".to_string());
        assert_eq!(config.require_token().unwrap(), "ya29.token");
    }
}
