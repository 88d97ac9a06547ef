// file: src/models/image.rs
// description: image object reference with gs:// and browser URL rendering
// reference: internal data structures

use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// A single image in the corpus, addressed by bucket and object name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageObject {
    pub bucket: String,
    pub name: String,
}

impl ImageObject {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
        }
    }

    /// The `gs://bucket/name` URI used by the Vision and Vertex APIs.
    pub fn gcs_uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.name)
    }

    /// The browser URL stored in the word index. The whole `bucket/name`
    /// path is form-urlencoded as one component, so `/` becomes `%2F` and
    /// spaces become `+`.
    pub fn public_url(&self) -> String {
        let path = format!("{}/{}", self.bucket, self.name);
        let encoded: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
        format!("https://storage.cloud.google.com/{}", encoded)
    }

    /// Parse a `gs://bucket/name` URI back into its parts.
    pub fn from_gcs_uri(uri: &str) -> Result<Self> {
        let rest = uri.strip_prefix("gs://").ok_or_else(|| {
            HarvestError::Validation(format!("not a gs:// URI: {}", uri))
        })?;

        let (bucket, name) = rest.split_once('/').ok_or_else(|| {
            HarvestError::Validation(format!("gs:// URI missing object name: {}", uri))
        })?;

        if bucket.is_empty() || name.is_empty() {
            return Err(HarvestError::Validation(format!(
                "gs:// URI missing bucket or object name: {}",
                uri
            )));
        }

        Ok(Self::new(bucket, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcs_uri() {
        let image = ImageObject::new("corpus", "diagrams/app.png");
        assert_eq!(image.gcs_uri(), "gs://corpus/diagrams/app.png");
    }

    #[test]
    fn test_public_url_encodes_path_as_one_component() {
        let image = ImageObject::new("corpus", "diagrams/app.png");
        assert_eq!(
            image.public_url(),
            "https://storage.cloud.google.com/corpus%2Fdiagrams%2Fapp.png"
        );
    }

    #[test]
    fn test_public_url_encodes_spaces_as_plus() {
        let image = ImageObject::new("corpus", "my diagram.png");
        assert_eq!(
            image.public_url(),
            "https://storage.cloud.google.com/corpus%2Fmy+diagram.png"
        );
    }

    #[test]
    fn test_from_gcs_uri_round_trip() {
        let image = ImageObject::from_gcs_uri("gs://corpus/diagrams/app.png").unwrap();
        assert_eq!(image, ImageObject::new("corpus", "diagrams/app.png"));
        assert_eq!(ImageObject::from_gcs_uri(&image.gcs_uri()).unwrap(), image);
    }

    #[test]
    fn test_from_gcs_uri_rejects_other_schemes() {
        assert!(ImageObject::from_gcs_uri("https://corpus/app.png").is_err());
    }

    #[test]
    fn test_from_gcs_uri_rejects_bucket_only() {
        assert!(ImageObject::from_gcs_uri("gs://corpus").is_err());
        assert!(ImageObject::from_gcs_uri("gs://corpus/").is_err());
        assert!(ImageObject::from_gcs_uri("gs:///app.png").is_err());
    }
}
