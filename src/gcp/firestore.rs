// file: src/gcp/firestore.rs
// description: Firestore REST client persisting the word/image index documents
// reference: https://firebase.google.com/docs/firestore/use-rest-api

use crate::error::{HarvestError, Result};
use crate::indexer::WordImageIndex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Persistence seam for the index. The real client reads and writes two
/// Firestore documents; tests keep the index in memory.
pub trait IndexStore {
    async fn load(&self) -> Result<WordImageIndex>;
    async fn save(&self, index: &WordImageIndex) -> Result<()>;
}

/// Wire form of a document: a flat map of field name to typed value.
#[derive(Debug, Serialize, Deserialize)]
struct FirestoreDocument {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FieldValue {
    #[serde(rename = "stringValue", skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(rename = "arrayValue", skip_serializing_if = "Option::is_none")]
    array_value: Option<ArrayValue>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArrayValue {
    // Firestore omits "values" entirely for an empty array.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<FieldValue>,
}

fn map_to_fields(map: &HashMap<String, Vec<String>>) -> HashMap<String, FieldValue> {
    map.iter()
        .map(|(key, entries)| {
            let values = entries
                .iter()
                .map(|entry| FieldValue {
                    string_value: Some(entry.clone()),
                    array_value: None,
                })
                .collect();
            (
                key.clone(),
                FieldValue {
                    string_value: None,
                    array_value: Some(ArrayValue { values }),
                },
            )
        })
        .collect()
}

fn fields_to_map(fields: HashMap<String, FieldValue>) -> HashMap<String, Vec<String>> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let entries = value
                .array_value
                .map(|array| {
                    array
                        .values
                        .into_iter()
                        .filter_map(|v| v.string_value)
                        .collect()
                })
                .unwrap_or_default();
            (key, entries)
        })
        .collect()
}

pub struct FirestoreClient {
    client: Client,
    token: String,
    project: String,
    collection: String,
    word_document: String,
    image_document: String,
}

impl FirestoreClient {
    pub fn new(
        token: String,
        project: String,
        collection: String,
        word_document: String,
        image_document: String,
    ) -> Self {
        Self {
            client: Client::new(),
            token,
            project,
            collection,
            word_document,
            image_document,
        }
    }

    fn document_url(&self, document: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            FIRESTORE_ENDPOINT, self.project, self.collection, document
        )
    }

    /// Fetches one document's fields. A missing document is an empty map,
    /// not an error, so a fresh project starts with an empty index.
    async fn fetch_fields(&self, document: &str) -> Result<HashMap<String, Vec<String>>> {
        let url = self.document_url(document);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .map_err(|e| {
                HarvestError::DocStore(format!("Failed to send document get request: {}", e))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Document {}/{} does not exist yet", self.collection, document);
            return Ok(HashMap::new());
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HarvestError::DocStore(format!(
                "Get of document {} failed with status {}: {}",
                document, status, error_text
            )));
        }

        let document: FirestoreDocument = response.json().await.map_err(|e| {
            HarvestError::DocStore(format!("Failed to parse document response: {}", e))
        })?;

        Ok(fields_to_map(document.fields))
    }

    /// Overwrites one document with the given fields. Patch without an
    /// update mask replaces the whole document.
    async fn store_fields(
        &self,
        document: &str,
        fields: HashMap<String, FieldValue>,
    ) -> Result<()> {
        let url = self.document_url(document);
        let body = FirestoreDocument { fields };

        let response = self
            .client
            .patch(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                HarvestError::DocStore(format!("Failed to send document patch request: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HarvestError::DocStore(format!(
                "Patch of document {} failed with status {}: {}",
                document, status, error_text
            )));
        }

        Ok(())
    }
}

impl IndexStore for FirestoreClient {
    async fn load(&self) -> Result<WordImageIndex> {
        let word_to_images = self.fetch_fields(&self.word_document).await?;
        let image_to_words = self.fetch_fields(&self.image_document).await?;

        debug!(
            "Loaded index: {} words, {} images",
            word_to_images.len(),
            image_to_words.len()
        );

        Ok(WordImageIndex {
            word_to_images,
            image_to_words,
        })
    }

    async fn save(&self, index: &WordImageIndex) -> Result<()> {
        self.store_fields(&self.word_document, map_to_fields(&index.word_to_images))
            .await?;
        self.store_fields(&self.image_document, map_to_fields(&index.image_to_words))
            .await?;
        Ok(())
    }
}
