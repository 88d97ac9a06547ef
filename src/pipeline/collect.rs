// file: src/pipeline/collect.rs
// description: copies images classified as diagrams into the diagrams prefix
// reference: https://cloud.google.com/vertex-ai/docs/predictions/get-batch-predictions

use crate::config::StorageConfig;
use crate::error::Result;
use crate::gcp::ObjectStore;
use crate::models::{ImageObject, confidence_for};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// One line of batch prediction output: the instance that went in and
/// the model's labels for it. Failed instances carry an error block
/// instead of a prediction.
#[derive(Debug, Deserialize)]
struct PredictionRecord {
    instance: RecordInstance,
    #[serde(default)]
    prediction: RecordPrediction,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RecordInstance {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordPrediction {
    #[serde(default)]
    display_names: Vec<String>,
    #[serde(default)]
    confidences: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectStats {
    pub records_scanned: usize,
    pub diagrams_copied: usize,
    pub copy_failures: usize,
    pub malformed_records: usize,
    pub error_records: usize,
}

fn destination_for(prefix: &str, source_name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), source_name)
}

pub struct DiagramCollector<'a, S: ObjectStore> {
    store: &'a S,
    config: &'a StorageConfig,
}

impl<'a, S: ObjectStore> DiagramCollector<'a, S> {
    pub fn new(store: &'a S, config: &'a StorageConfig) -> Self {
        Self { store, config }
    }

    /// Scans every batch prediction output under the predictions prefix
    /// and copies each image whose diagram-label confidence reaches the
    /// configured threshold. Bad records and failed copies are counted,
    /// not fatal.
    pub async fn run(&self) -> Result<CollectStats> {
        let outputs = self
            .store
            .list_objects(&self.config.bucket, &self.config.predictions_prefix)
            .await?;

        let mut stats = CollectStats::default();

        for output in &outputs {
            if output.name.ends_with('/') {
                continue;
            }

            debug!("Scanning prediction output {}", output.gcs_uri());
            let data = self.store.download(output).await?;
            let text = String::from_utf8_lossy(&data);

            for line in text.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                stats.records_scanned += 1;

                let record: PredictionRecord = match serde_json::from_str(line) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Malformed prediction record in {}: {}", output.name, e);
                        stats.malformed_records += 1;
                        continue;
                    }
                };

                if record.error.is_some() {
                    warn!("Prediction failed for {}", record.instance.content);
                    stats.error_records += 1;
                    continue;
                }

                let confidence = confidence_for(
                    &record.prediction.display_names,
                    &record.prediction.confidences,
                    &self.config.diagram_label,
                );

                let Some(confidence) = confidence else {
                    continue;
                };
                if confidence < self.config.min_confidence {
                    continue;
                }

                let source = match ImageObject::from_gcs_uri(&record.instance.content) {
                    Ok(source) => source,
                    Err(e) => {
                        warn!("Unusable image reference in {}: {}", output.name, e);
                        stats.malformed_records += 1;
                        continue;
                    }
                };

                let destination = destination_for(&self.config.diagrams_prefix, &source.name);

                match self
                    .store
                    .copy(&source, &self.config.bucket, &destination)
                    .await
                {
                    Ok(()) => {
                        debug!("Copied {} (confidence {:.2})", source.gcs_uri(), confidence);
                        stats.diagrams_copied += 1;
                    }
                    Err(e) => {
                        warn!("Failed to copy {}: {}", source.gcs_uri(), e);
                        stats.copy_failures += 1;
                    }
                }
            }
        }

        info!(
            "Collected {} diagrams from {} records across {} output files",
            stats.diagrams_copied,
            stats.records_scanned,
            outputs.len()
        );
        Ok(stats)
    }
}
