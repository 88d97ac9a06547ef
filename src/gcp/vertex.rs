// file: src/gcp/vertex.rs
// description: Vertex AI client for online prediction, dataset import and batch jobs
// reference: https://cloud.google.com/vertex-ai/docs/reference/rest

use crate::config::VertexConfig;
use crate::error::{HarvestError, Result};
use crate::models::{Classification, zip_classifications};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

const DATASET_METADATA_SCHEMA: &str =
    "gs://google-cloud-aiplatform/schema/dataset/metadata/image_1.0.0.yaml";
const SINGLE_LABEL_IMPORT_SCHEMA: &str =
    "gs://google-cloud-aiplatform/schema/dataset/ioformat/image_classification_single_label_io_format_1.0.0.yaml";

const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;
const DEFAULT_MAX_PREDICTIONS: u32 = 5;

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    confidence_threshold: f64,
    max_predictions: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<PredictionResult>,
    deployed_model_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictionResult {
    #[serde(default)]
    display_names: Vec<String>,
    #[serde(default)]
    confidences: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDatasetRequest {
    display_name: String,
    metadata_schema_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportDataRequest {
    import_configs: Vec<ImportDataConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportDataConfig {
    gcs_source: GcsSource,
    import_schema_uri: String,
}

#[derive(Debug, Serialize)]
struct GcsSource {
    uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationStatus>,
    response: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    code: Option<i32>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBatchJobRequest {
    display_name: String,
    model: String,
    input_config: BatchInputConfig,
    output_config: BatchOutputConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchInputConfig {
    instances_format: String,
    gcs_source: GcsSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchOutputConfig {
    predictions_format: String,
    gcs_destination: GcsDestination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GcsDestination {
    output_uri_prefix: String,
}

#[derive(Debug, Deserialize)]
struct BatchJob {
    name: String,
    #[serde(default)]
    state: String,
    error: Option<OperationStatus>,
}

/// Result of one online classification call.
#[derive(Debug, Clone)]
pub struct OnlinePrediction {
    pub deployed_model_id: Option<String>,
    pub classifications: Vec<Classification>,
}

fn is_terminal_state(state: &str) -> bool {
    matches!(
        state,
        "JOB_STATE_SUCCEEDED"
            | "JOB_STATE_FAILED"
            | "JOB_STATE_CANCELLED"
            | "JOB_STATE_EXPIRED"
            | "JOB_STATE_PARTIALLY_SUCCEEDED"
    )
}

pub struct VertexClient {
    client: Client,
    token: String,
    base_url: String,
    project: String,
    config: VertexConfig,
}

impl VertexClient {
    pub fn new(token: String, project: String, config: VertexConfig) -> Self {
        // Vertex resources live behind regional endpoints.
        let base_url = format!("https://{}-aiplatform.googleapis.com/v1", config.location);
        Self {
            client: Client::new(),
            token,
            base_url,
            project,
            config,
        }
    }

    fn location_path(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.config.location)
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                HarvestError::Prediction(format!("Failed to send Vertex request: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HarvestError::Prediction(format!(
                "Vertex request failed with status {}: {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            HarvestError::Prediction(format!("Failed to parse Vertex response: {}", e))
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| {
                HarvestError::Prediction(format!("Failed to send Vertex poll request: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HarvestError::Prediction(format!(
                "Vertex poll failed with status {}: {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            HarvestError::Prediction(format!("Failed to parse Vertex poll response: {}", e))
        })
    }

    /// Classifies one image against the deployed endpoint. The caller
    /// supplies raw image bytes; they go over the wire base64-encoded.
    pub async fn classify(&self, image_data: &[u8]) -> Result<OnlinePrediction> {
        let endpoint_id = self.config.endpoint_id.as_deref().ok_or_else(|| {
            HarvestError::Config(
                "vertex.endpoint_id is required for online classification".to_string(),
            )
        })?;

        let url = format!(
            "{}/{}/endpoints/{}:predict",
            self.base_url,
            self.location_path(),
            endpoint_id
        );

        let request = PredictRequest {
            instances: vec![PredictInstance {
                content: STANDARD.encode(image_data),
            }],
            parameters: PredictParameters {
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                max_predictions: DEFAULT_MAX_PREDICTIONS,
            },
        };

        debug!("Requesting online prediction for {} bytes", image_data.len());

        let response: PredictResponse = self.post_json(&url, &request).await?;

        let prediction = response.predictions.into_iter().next().ok_or_else(|| {
            HarvestError::Prediction("No prediction returned from endpoint".to_string())
        })?;

        Ok(OnlinePrediction {
            deployed_model_id: response.deployed_model_id,
            classifications: zip_classifications(
                &prediction.display_names,
                &prediction.confidences,
            ),
        })
    }

    /// Creates a single-label image dataset and imports the manifest into
    /// it. Both steps are long-running operations; returns the dataset
    /// resource name once the import finishes.
    pub async fn create_image_dataset(
        &self,
        display_name: &str,
        manifest_uri: &str,
    ) -> Result<String> {
        let url = format!("{}/{}/datasets", self.base_url, self.location_path());
        let request = CreateDatasetRequest {
            display_name: display_name.to_string(),
            metadata_schema_uri: DATASET_METADATA_SCHEMA.to_string(),
        };

        let operation: Operation = self.post_json(&url, &request).await?;
        info!("Creating dataset via operation {}", operation.name);
        let finished = self.wait_for_operation(operation).await?;

        let dataset_name = finished
            .response
            .as_ref()
            .and_then(|r| r.get("name"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                HarvestError::Prediction(
                    "Dataset create operation finished without a resource name".to_string(),
                )
            })?
            .to_string();

        info!("Created dataset {}", dataset_name);

        let import_url = format!("{}/{}:import", self.base_url, dataset_name);
        let import_request = ImportDataRequest {
            import_configs: vec![ImportDataConfig {
                gcs_source: GcsSource {
                    uris: vec![manifest_uri.to_string()],
                },
                import_schema_uri: SINGLE_LABEL_IMPORT_SCHEMA.to_string(),
            }],
        };

        let operation: Operation = self.post_json(&import_url, &import_request).await?;
        info!("Importing {} via operation {}", manifest_uri, operation.name);
        self.wait_for_operation(operation).await?;

        info!("Import into {} complete", dataset_name);
        Ok(dataset_name)
    }

    /// Submits a batch prediction job over a JSONL manifest and waits for
    /// it to reach a terminal state. Returns the job resource name.
    pub async fn run_batch_prediction(
        &self,
        display_name: &str,
        source_uri: &str,
        destination_prefix: &str,
    ) -> Result<String> {
        let model = self.config.model.as_deref().ok_or_else(|| {
            HarvestError::Config("vertex.model is required for batch prediction".to_string())
        })?;

        // Accept either a bare model id or a full resource name.
        let model_name = if model.contains('/') {
            model.to_string()
        } else {
            format!("{}/models/{}", self.location_path(), model)
        };

        let url = format!("{}/{}/batchPredictionJobs", self.base_url, self.location_path());
        let request = CreateBatchJobRequest {
            display_name: display_name.to_string(),
            model: model_name,
            input_config: BatchInputConfig {
                instances_format: "jsonl".to_string(),
                gcs_source: GcsSource {
                    uris: vec![source_uri.to_string()],
                },
            },
            output_config: BatchOutputConfig {
                predictions_format: "jsonl".to_string(),
                gcs_destination: GcsDestination {
                    output_uri_prefix: destination_prefix.to_string(),
                },
            },
        };

        let job: BatchJob = self.post_json(&url, &request).await?;
        info!("Created batch prediction job {}", job.name);
        self.wait_for_job(job).await
    }

    async fn wait_for_operation(&self, operation: Operation) -> Result<Operation> {
        let mut current = operation;
        let mut consecutive_failures: u32 = 0;

        for _ in 0..self.config.poll.max_attempts {
            if current.done {
                if let Some(error) = current.error {
                    return Err(HarvestError::Prediction(format!(
                        "Operation {} failed (code {}): {}",
                        current.name,
                        error.code.unwrap_or_default(),
                        error.message.unwrap_or_else(|| "unknown".to_string())
                    )));
                }
                return Ok(current);
            }

            sleep(self.config.poll.delay_for(consecutive_failures)).await;

            let url = format!("{}/{}", self.base_url, current.name);
            match self.get_json::<Operation>(&url).await {
                Ok(operation) => {
                    current = operation;
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        "Operation poll failed ({} consecutive): {}",
                        consecutive_failures, e
                    );
                }
            }
        }

        Err(HarvestError::Prediction(format!(
            "Gave up waiting for operation {} after {} attempts",
            current.name, self.config.poll.max_attempts
        )))
    }

    async fn wait_for_job(&self, job: BatchJob) -> Result<String> {
        let mut current = job;
        let mut consecutive_failures: u32 = 0;

        for _ in 0..self.config.poll.max_attempts {
            if is_terminal_state(&current.state) {
                return match current.state.as_str() {
                    "JOB_STATE_SUCCEEDED" => Ok(current.name),
                    "JOB_STATE_PARTIALLY_SUCCEEDED" => {
                        warn!("Batch prediction job {} partially succeeded", current.name);
                        Ok(current.name)
                    }
                    _ => {
                        let detail = current
                            .error
                            .and_then(|e| e.message)
                            .unwrap_or_else(|| "no detail".to_string());
                        Err(HarvestError::Prediction(format!(
                            "Batch prediction job {} ended in {}: {}",
                            current.name, current.state, detail
                        )))
                    }
                };
            }

            debug!("Job {} in state {}", current.name, current.state);
            sleep(self.config.poll.delay_for(consecutive_failures)).await;

            let url = format!("{}/{}", self.base_url, current.name);
            match self.get_json::<BatchJob>(&url).await {
                Ok(job) => {
                    current = job;
                    consecutive_failures = 0;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!("Job poll failed ({} consecutive): {}", consecutive_failures, e);
                }
            }
        }

        Err(HarvestError::Prediction(format!(
            "Gave up waiting for job {} after {} attempts",
            current.name, self.config.poll.max_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(is_terminal_state("JOB_STATE_SUCCEEDED"));
        assert!(is_terminal_state("JOB_STATE_FAILED"));
        assert!(is_terminal_state("JOB_STATE_CANCELLED"));
        assert!(is_terminal_state("JOB_STATE_EXPIRED"));
        assert!(is_terminal_state("JOB_STATE_PARTIALLY_SUCCEEDED"));

        assert!(!is_terminal_state("JOB_STATE_PENDING"));
        assert!(!is_terminal_state("JOB_STATE_RUNNING"));
        assert!(!is_terminal_state(""));
    }

    #[test]
    fn test_predict_request_serialization() {
        let request = PredictRequest {
            instances: vec![PredictInstance {
                content: "aGVsbG8=".to_string(),
            }],
            parameters: PredictParameters {
                confidence_threshold: 0.5,
                max_predictions: 5,
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["instances"][0]["content"], "aGVsbG8=");
        assert_eq!(json["parameters"]["confidenceThreshold"], 0.5);
        assert_eq!(json["parameters"]["maxPredictions"], 5);
    }

    #[test]
    fn test_predict_response_parsing() {
        let json = r#"{
            "predictions": [{
                "ids": ["1", "2"],
                "displayNames": ["arch_diagram", "other"],
                "confidences": [0.98, 0.02]
            }],
            "deployedModelId": "12345"
        }"#;
        let parsed: PredictResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.deployed_model_id.as_deref(), Some("12345"));
        assert_eq!(parsed.predictions[0].display_names[0], "arch_diagram");
        assert_eq!(parsed.predictions[0].confidences[0], 0.98);
    }

    #[test]
    fn test_batch_job_request_serialization() {
        let request = CreateBatchJobRequest {
            display_name: "harvest".to_string(),
            model: "projects/p/locations/l/models/m".to_string(),
            input_config: BatchInputConfig {
                instances_format: "jsonl".to_string(),
                gcs_source: GcsSource {
                    uris: vec!["gs://bucket/batch_predict.jsonl".to_string()],
                },
            },
            output_config: BatchOutputConfig {
                predictions_format: "jsonl".to_string(),
                gcs_destination: GcsDestination {
                    output_uri_prefix: "gs://bucket/predictions/".to_string(),
                },
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["displayName"], "harvest");
        assert_eq!(json["inputConfig"]["instancesFormat"], "jsonl");
        assert_eq!(
            json["inputConfig"]["gcsSource"]["uris"][0],
            "gs://bucket/batch_predict.jsonl"
        );
        assert_eq!(
            json["outputConfig"]["gcsDestination"]["outputUriPrefix"],
            "gs://bucket/predictions/"
        );
    }

    #[test]
    fn test_operation_parsing() {
        let json = r#"{
            "name": "projects/p/locations/l/operations/42",
            "done": true,
            "response": {"name": "projects/p/locations/l/datasets/7"}
        }"#;
        let parsed: Operation = serde_json::from_str(json).unwrap();
        assert!(parsed.done);
        assert_eq!(
            parsed.response.unwrap()["name"],
            "projects/p/locations/l/datasets/7"
        );
    }

    #[test]
    fn test_operation_error_parsing() {
        let json = r#"{
            "name": "projects/p/locations/l/operations/42",
            "done": true,
            "error": {"code": 3, "message": "invalid manifest"}
        }"#;
        let parsed: Operation = serde_json::from_str(json).unwrap();
        let error = parsed.error.unwrap();
        assert_eq!(error.code, Some(3));
        assert_eq!(error.message.as_deref(), Some("invalid manifest"));
    }
}
