// file: src/gcp/storage.rs
// description: JSON API client for Cloud Storage object operations
// reference: https://cloud.google.com/storage/docs/json_api/v1

use crate::error::{HarvestError, Result};
use crate::models::ImageObject;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

const STORAGE_ENDPOINT: &str = "https://storage.googleapis.com/storage/v1";
const UPLOAD_ENDPOINT: &str = "https://storage.googleapis.com/upload/storage/v1";

/// Object storage operations the pipeline stages depend on. Stages take
/// this as a generic bound so tests can substitute an in-memory store.
pub trait ObjectStore {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ImageObject>>;
    async fn download(&self, object: &ImageObject) -> Result<Vec<u8>>;
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;
    async fn copy(&self, source: &ImageObject, dest_bucket: &str, dest_name: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectResource>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectResource {
    name: String,
}

pub struct GcsClient {
    client: Client,
    token: String,
}

impl GcsClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            token,
        }
    }

    /// Builds `{endpoint}/b/{bucket}/o/{name}` with the object name
    /// percent-encoded as a single path segment. Slashes inside object
    /// names must arrive as %2F or the API resolves a different resource.
    fn object_url(&self, endpoint: &str, bucket: &str, name: &str) -> Result<Url> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| HarvestError::Storage(format!("Invalid storage endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| HarvestError::Storage("Storage endpoint cannot be a base".to_string()))?
            .extend(["b", bucket, "o", name]);
        Ok(url)
    }

    fn copy_url(&self, source: &ImageObject, dest_bucket: &str, dest_name: &str) -> Result<Url> {
        let mut url = Url::parse(STORAGE_ENDPOINT)
            .map_err(|e| HarvestError::Storage(format!("Invalid storage endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| HarvestError::Storage("Storage endpoint cannot be a base".to_string()))?
            .extend([
                "b",
                source.bucket.as_str(),
                "o",
                source.name.as_str(),
                "copyTo",
                "b",
                dest_bucket,
                "o",
                dest_name,
            ]);
        Ok(url)
    }
}

impl ObjectStore for GcsClient {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ImageObject>> {
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = Url::parse(&format!("{}/b/{}/o", STORAGE_ENDPOINT, bucket))
                .map_err(|e| HarvestError::Storage(format!("Invalid list URL: {}", e)))?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("prefix", prefix);
                pairs.append_pair("fields", "items(name),nextPageToken");
                if let Some(ref token) = page_token {
                    pairs.append_pair("pageToken", token);
                }
            }

            debug!("Listing objects in gs://{}/{}", bucket, prefix);

            let response = self
                .client
                .get(url)
                .header("Authorization", format!("Bearer {}", self.token))
                .send()
                .await
                .map_err(|e| {
                    HarvestError::Storage(format!("Failed to send list request: {}", e))
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(HarvestError::Storage(format!(
                    "List request failed with status {}: {}",
                    status, error_text
                )));
            }

            let list: ListResponse = response.json().await.map_err(|e| {
                HarvestError::Storage(format!("Failed to parse list response: {}", e))
            })?;

            objects.extend(
                list.items
                    .into_iter()
                    .map(|item| ImageObject::new(bucket, &item.name)),
            );

            page_token = list.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!("Listed {} objects under gs://{}/{}", objects.len(), bucket, prefix);
        Ok(objects)
    }

    async fn download(&self, object: &ImageObject) -> Result<Vec<u8>> {
        let mut url = self.object_url(STORAGE_ENDPOINT, &object.bucket, &object.name)?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| {
                HarvestError::Storage(format!("Failed to send download request: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HarvestError::Storage(format!(
                "Download of {} failed with status {}: {}",
                object.gcs_uri(),
                status,
                error_text
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            HarvestError::Storage(format!("Failed to read download body: {}", e))
        })?;

        debug!("Downloaded {} ({} bytes)", object.gcs_uri(), bytes.len());
        Ok(bytes.to_vec())
    }

    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let mut url = Url::parse(&format!("{}/b/{}/o", UPLOAD_ENDPOINT, bucket))
            .map_err(|e| HarvestError::Storage(format!("Invalid upload URL: {}", e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("uploadType", "media");
            pairs.append_pair("name", name);
        }

        debug!("Uploading {} bytes to gs://{}/{}", data.len(), bucket, name);

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| {
                HarvestError::Storage(format!("Failed to send upload request: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HarvestError::Storage(format!(
                "Upload of gs://{}/{} failed with status {}: {}",
                bucket, name, status, error_text
            )));
        }

        Ok(())
    }

    async fn copy(&self, source: &ImageObject, dest_bucket: &str, dest_name: &str) -> Result<()> {
        let url = self.copy_url(source, dest_bucket, dest_name)?;

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(|e| HarvestError::Storage(format!("Failed to send copy request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HarvestError::Storage(format!(
                "Copy of {} to gs://{}/{} failed with status {}: {}",
                source.gcs_uri(),
                dest_bucket,
                dest_name,
                status,
                error_text
            )));
        }

        debug!(
            "Copied {} to gs://{}/{}",
            source.gcs_uri(),
            dest_bucket,
            dest_name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_encodes_slashes() {
        let client = GcsClient::new("token".to_string());
        let url = client
            .object_url(STORAGE_ENDPOINT, "my-bucket", "images/photo 1.jpg")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/my-bucket/o/images%2Fphoto%201.jpg"
        );
    }

    #[test]
    fn test_copy_url_shape() {
        let client = GcsClient::new("token".to_string());
        let source = ImageObject::new("src-bucket", "images/a.jpg");
        let url = client.copy_url(&source, "src-bucket", "diagrams/a.jpg").unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/src-bucket/o/images%2Fa.jpg/copyTo/b/src-bucket/o/diagrams%2Fa.jpg"
        );
    }

    #[test]
    fn test_list_response_parsing() {
        let json = r#"{
            "items": [{"name": "images/a.jpg"}, {"name": "images/b.jpg"}],
            "nextPageToken": "token123"
        }"#;
        let parsed: ListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].name, "images/a.jpg");
        assert_eq!(parsed.next_page_token.as_deref(), Some("token123"));
    }

    #[test]
    fn test_list_response_final_page() {
        let parsed: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());
        assert!(parsed.next_page_token.is_none());
    }
}
