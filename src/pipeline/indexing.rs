// file: src/pipeline/indexing.rs
// description: OCR-and-index stage building the word/image maps from stored diagrams
// reference: runs text detection, normalizes words and persists the index per image

use crate::config::{IndexConfig, StorageConfig};
use crate::error::Result;
use crate::gcp::{IndexStore, ObjectStore, TextDetector};
use crate::indexer::normalize_and_filter;
use crate::models::ImageObject;
use crate::pipeline::progress::{PipelineStats, ProgressTracker};
use crate::utils::{OperationTimer, Validator};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub struct TextIndexer<'a, S, D, I>
where
    S: ObjectStore,
    D: TextDetector,
    I: IndexStore,
{
    store: &'a S,
    detector: &'a D,
    index_store: &'a I,
    storage: &'a StorageConfig,
    index_config: &'a IndexConfig,
}

impl<'a, S, D, I> TextIndexer<'a, S, D, I>
where
    S: ObjectStore,
    D: TextDetector,
    I: IndexStore,
{
    pub fn new(
        store: &'a S,
        detector: &'a D,
        index_store: &'a I,
        storage: &'a StorageConfig,
        index_config: &'a IndexConfig,
    ) -> Self {
        Self {
            store,
            detector,
            index_store,
            storage,
            index_config,
        }
    }

    /// Indexes every diagram under the diagrams prefix, one image at a
    /// time: OCR, normalize, merge into both maps, persist. The index is
    /// loaded once up front and written back after each image, so an
    /// interrupted run keeps everything indexed so far.
    pub async fn run(&self, colored: bool) -> Result<PipelineStats> {
        let timer = OperationTimer::new("index diagrams");

        let objects = self
            .store
            .list_objects(&self.storage.bucket, &self.storage.diagrams_prefix)
            .await?;
        let images: Vec<ImageObject> = objects
            .into_iter()
            .filter(|o| !o.name.ends_with('/'))
            .collect();

        if images.is_empty() {
            info!(
                "No diagrams under gs://{}/{}, nothing to index",
                self.storage.bucket, self.storage.diagrams_prefix
            );
            return Ok(PipelineStats::new());
        }

        let mut index = self.index_store.load().await?;
        info!(
            "Indexing {} diagrams into an index of {} words / {} images",
            images.len(),
            index.word_count(),
            index.image_count()
        );

        let tracker = ProgressTracker::with_color(images.len(), colored);

        for image in &images {
            tracker.set_message(image.name.clone());
            let uri = image.gcs_uri();

            // A failed or empty OCR call still indexes the image, with an
            // empty word set.
            let (words, detected) = match self.detector.detect_text(&uri).await {
                Ok(annotations) => {
                    let combined = annotations.join(" ");
                    debug!(
                        "OCR text for {}: {}",
                        image.name,
                        Validator::truncate_text(&combined, 120)
                    );
                    (normalize_and_filter(&combined), true)
                }
                Err(e) => {
                    warn!("Text detection failed for {}: {}", uri, e);
                    (BTreeSet::new(), false)
                }
            };

            let url = image.public_url();
            index.index_image(&url, &words, self.index_config.merge_semantics);
            tracker.add_words(words.len());

            if let Err(e) = self.index_store.save(&index).await {
                warn!("Failed to persist index after {}: {}", image.name, e);
                tracker.inc_persist_failures();
            }

            if detected {
                tracker.inc_images_processed();
            } else {
                tracker.inc_images_failed();
            }
        }

        tracker.finish();
        let stats = tracker.get_stats();
        timer.finish_with_count(stats.images_processed + stats.images_failed);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::MergeSemantics;
    use crate::pipeline::fakes::{CannedDetector, FakeObjectStore, MemoryIndexStore};

    fn storage_config() -> StorageConfig {
        StorageConfig {
            bucket: "corpus".to_string(),
            images_prefix: "images/".to_string(),
            diagrams_prefix: "diagrams/".to_string(),
            predictions_prefix: "predictions/".to_string(),
            diagram_label: "arch_diagram".to_string(),
            min_confidence: 1.0,
        }
    }

    fn index_config() -> IndexConfig {
        IndexConfig {
            collection: "image_text".to_string(),
            word_document: "word_to_images".to_string(),
            image_document: "image_to_words".to_string(),
            merge_semantics: MergeSemantics::Append,
            top_words: 100,
        }
    }

    #[tokio::test]
    async fn test_indexes_each_diagram_and_persists_per_image() {
        let store = FakeObjectStore::new();
        store.put("corpus", "diagrams/images/a.jpg", vec![]);
        store.put("corpus", "diagrams/images/b.jpg", vec![]);

        let detector = CannedDetector::new()
            .with_text(
                "gs://corpus/diagrams/images/a.jpg",
                &["Cache Node\nAPI", "Cache", "Node", "API"],
            )
            .with_text("gs://corpus/diagrams/images/b.jpg", &["API Gateway"]);
        let index_store = MemoryIndexStore::new();

        let storage = storage_config();
        let index_cfg = index_config();
        let indexer = TextIndexer::new(&store, &detector, &index_store, &storage, &index_cfg);
        let stats = indexer.run(false).await.unwrap();

        assert_eq!(stats.images_processed, 2);
        assert_eq!(stats.images_failed, 0);
        assert_eq!(index_store.save_count(), 2);

        let index = index_store.snapshot();
        let url_a = ImageObject::new("corpus", "diagrams/images/a.jpg").public_url();
        let url_b = ImageObject::new("corpus", "diagrams/images/b.jpg").public_url();

        assert_eq!(
            index.image_to_words[&url_a],
            vec!["api".to_string(), "cache".to_string(), "node".to_string()]
        );
        assert_eq!(
            index.image_to_words[&url_b],
            vec!["api".to_string(), "gateway".to_string()]
        );
        assert_eq!(index.word_to_images["api"], vec![url_a, url_b]);
    }

    #[tokio::test]
    async fn test_detection_failure_indexes_empty_word_set() {
        let store = FakeObjectStore::new();
        store.put("corpus", "diagrams/images/broken.jpg", vec![]);

        let detector =
            CannedDetector::new().failing_for("gs://corpus/diagrams/images/broken.jpg");
        let index_store = MemoryIndexStore::new();

        let storage = storage_config();
        let index_cfg = index_config();
        let indexer = TextIndexer::new(&store, &detector, &index_store, &storage, &index_cfg);
        let stats = indexer.run(false).await.unwrap();

        assert_eq!(stats.images_processed, 0);
        assert_eq!(stats.images_failed, 1);
        // The image is still recorded and persisted.
        assert_eq!(index_store.save_count(), 1);
        let index = index_store.snapshot();
        let url = ImageObject::new("corpus", "diagrams/images/broken.jpg").public_url();
        assert!(index.image_to_words[&url].is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_continues_with_next_image() {
        let store = FakeObjectStore::new();
        store.put("corpus", "diagrams/images/a.jpg", vec![]);
        store.put("corpus", "diagrams/images/b.jpg", vec![]);

        let detector = CannedDetector::new()
            .with_text("gs://corpus/diagrams/images/a.jpg", &["alpha"])
            .with_text("gs://corpus/diagrams/images/b.jpg", &["beta"]);
        let index_store = MemoryIndexStore::new();
        index_store.fail_save_number(1);

        let storage = storage_config();
        let index_cfg = index_config();
        let indexer = TextIndexer::new(&store, &detector, &index_store, &storage, &index_cfg);
        let stats = indexer.run(false).await.unwrap();

        assert_eq!(stats.persist_failures, 1);
        assert_eq!(stats.images_processed, 2);
        assert_eq!(index_store.save_count(), 2);

        // The second save carries the accumulated state, so the first
        // image's words survive the earlier failure.
        let index = index_store.snapshot();
        assert_eq!(index.word_count(), 2);
    }

    #[tokio::test]
    async fn test_existing_index_is_merged_not_replaced() {
        let store = FakeObjectStore::new();
        store.put("corpus", "diagrams/images/new.jpg", vec![]);

        let detector =
            CannedDetector::new().with_text("gs://corpus/diagrams/images/new.jpg", &["cache"]);

        let mut seeded = crate::indexer::WordImageIndex::new();
        let old_words: BTreeSet<String> = ["cache".to_string()].into_iter().collect();
        seeded.index_image("https://storage.cloud.google.com/old", &old_words, MergeSemantics::Append);
        let index_store = MemoryIndexStore::with_index(seeded);

        let storage = storage_config();
        let index_cfg = index_config();
        let indexer = TextIndexer::new(&store, &detector, &index_store, &storage, &index_cfg);
        indexer.run(false).await.unwrap();

        let index = index_store.snapshot();
        let new_url = ImageObject::new("corpus", "diagrams/images/new.jpg").public_url();
        assert_eq!(
            index.word_to_images["cache"],
            vec!["https://storage.cloud.google.com/old".to_string(), new_url]
        );
        assert_eq!(index.image_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_prefix_is_a_no_op() {
        let store = FakeObjectStore::new();
        let detector = CannedDetector::new();
        let index_store = MemoryIndexStore::new();

        let storage = storage_config();
        let index_cfg = index_config();
        let indexer = TextIndexer::new(&store, &detector, &index_store, &storage, &index_cfg);
        let stats = indexer.run(false).await.unwrap();

        assert_eq!(stats.images_processed, 0);
        assert_eq!(index_store.save_count(), 0);
    }
}
