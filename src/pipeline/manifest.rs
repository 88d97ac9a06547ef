// file: src/pipeline/manifest.rs
// description: JSONL manifest generation for dataset import and batch prediction
// reference: https://cloud.google.com/vertex-ai/docs/image-data/classification/prepare-data

use crate::config::StorageConfig;
use crate::error::{HarvestError, Result};
use crate::gcp::ObjectStore;
use crate::models::ImageObject;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DATASET_MANIFEST_NAME: &str = "image_list.jsonl";
pub const BATCH_MANIFEST_NAME: &str = "batch_predict.jsonl";

const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Which consumer the manifest is written for. Dataset import and batch
/// prediction read different record shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Dataset,
    BatchPrediction,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetEntry {
    pub image_gcs_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchEntry {
    pub content: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct ManifestSummary {
    pub uri: String,
    pub entries: usize,
}

fn render_lines(kind: ManifestKind, images: &[ImageObject]) -> Result<String> {
    let mut lines = String::new();
    for image in images {
        let line = match kind {
            ManifestKind::Dataset => serde_json::to_string(&DatasetEntry {
                image_gcs_uri: image.gcs_uri(),
            })?,
            ManifestKind::BatchPrediction => serde_json::to_string(&BatchEntry {
                content: image.gcs_uri(),
                mime_type: IMAGE_MIME_TYPE.to_string(),
            })?,
        };
        lines.push_str(&line);
        lines.push('\n');
    }
    Ok(lines)
}

pub struct ManifestBuilder<'a, S: ObjectStore> {
    store: &'a S,
    config: &'a StorageConfig,
}

impl<'a, S: ObjectStore> ManifestBuilder<'a, S> {
    pub fn new(store: &'a S, config: &'a StorageConfig) -> Self {
        Self { store, config }
    }

    /// Lists the image corpus and uploads one manifest line per image.
    /// The manifest lands in the corpus bucket under `output_name`.
    pub async fn build(
        &self,
        kind: ManifestKind,
        output_name: Option<&str>,
    ) -> Result<ManifestSummary> {
        let objects = self
            .store
            .list_objects(&self.config.bucket, &self.config.images_prefix)
            .await?;

        // Folder placeholder objects are not images.
        let images: Vec<ImageObject> = objects
            .into_iter()
            .filter(|o| !o.name.ends_with('/'))
            .collect();

        if images.is_empty() {
            return Err(HarvestError::Validation(format!(
                "No images found under gs://{}/{}",
                self.config.bucket, self.config.images_prefix
            )));
        }

        debug!("Building {:?} manifest for {} images", kind, images.len());

        let lines = render_lines(kind, &images)?;
        let name = output_name.unwrap_or(match kind {
            ManifestKind::Dataset => DATASET_MANIFEST_NAME,
            ManifestKind::BatchPrediction => BATCH_MANIFEST_NAME,
        });

        self.store
            .upload(
                &self.config.bucket,
                name,
                lines.into_bytes(),
                "application/json",
            )
            .await?;

        let uri = format!("gs://{}/{}", self.config.bucket, name);
        info!("Uploaded manifest {} with {} entries", uri, images.len());

        Ok(ManifestSummary {
            uri,
            entries: images.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images() -> Vec<ImageObject> {
        vec![
            ImageObject::new("corpus", "images/a.jpg"),
            ImageObject::new("corpus", "images/b.png"),
        ]
    }

    #[test]
    fn test_dataset_lines() {
        let lines = render_lines(ManifestKind::Dataset, &images()).unwrap();
        let mut parsed = lines.lines();
        assert_eq!(
            parsed.next().unwrap(),
            r#"{"imageGcsUri":"gs://corpus/images/a.jpg"}"#
        );
        assert_eq!(
            parsed.next().unwrap(),
            r#"{"imageGcsUri":"gs://corpus/images/b.png"}"#
        );
        assert!(parsed.next().is_none());
        assert!(lines.ends_with('\n'));
    }

    #[test]
    fn test_batch_lines() {
        let lines = render_lines(ManifestKind::BatchPrediction, &images()).unwrap();
        let first = lines.lines().next().unwrap();
        let entry: BatchEntry = serde_json::from_str(first).unwrap();
        assert_eq!(entry.content, "gs://corpus/images/a.jpg");
        assert_eq!(entry.mime_type, "image/jpeg");
    }

    #[test]
    fn test_batch_entry_wire_keys() {
        let entry = BatchEntry {
            content: "gs://corpus/images/a.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("mimeType").is_some());
        assert!(json.get("mime_type").is_none());
    }
}
