// file: src/gcp/vision.rs
// description: Vision API client for text detection on stored images
// reference: https://cloud.google.com/vision/docs/ocr

use crate::error::{HarvestError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// OCR seam for the indexing stage. The real client calls the Vision
/// API; tests provide canned annotations.
pub trait TextDetector {
    /// Returns every text annotation detected on the image, full-text
    /// block first, individual fragments after.
    async fn detect_text(&self, image_uri: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: ImageRef,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageRef {
    source: ImageSource,
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "imageUri")]
    image_uri: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    feature_type: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
struct AnnotateImageResponse {
    #[serde(rename = "textAnnotations", default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: Option<i32>,
    message: Option<String>,
}

pub struct VisionClient {
    client: Client,
    token: String,
}

impl VisionClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            token,
        }
    }
}

impl TextDetector for VisionClient {
    async fn detect_text(&self, image_uri: &str) -> Result<Vec<String>> {
        let request = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageRef {
                    source: ImageSource {
                        image_uri: image_uri.to_string(),
                    },
                },
                features: vec![Feature {
                    feature_type: "TEXT_DETECTION".to_string(),
                }],
            }],
        };

        debug!("Requesting text detection for {}", image_uri);

        let response = self
            .client
            .post(VISION_ENDPOINT)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                HarvestError::Vision(format!("Failed to send annotate request: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HarvestError::Vision(format!(
                "Annotate request failed with status {}: {}",
                status, error_text
            )));
        }

        let annotate: AnnotateResponse = response.json().await.map_err(|e| {
            HarvestError::Vision(format!("Failed to parse annotate response: {}", e))
        })?;

        let image_response = annotate.responses.into_iter().next().ok_or_else(|| {
            HarvestError::Vision(format!("No annotation returned for {}", image_uri))
        })?;

        // The API reports per-image failures inside a 200 response.
        if let Some(error) = image_response.error {
            return Err(HarvestError::Vision(format!(
                "Text detection for {} failed (code {}): {}",
                image_uri,
                error.code.unwrap_or_default(),
                error.message.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        let annotations: Vec<String> = image_response
            .text_annotations
            .into_iter()
            .map(|a| a.description)
            .collect();

        debug!(
            "Detected {} text annotations on {}",
            annotations.len(),
            image_uri
        );
        Ok(annotations)
    }
}
