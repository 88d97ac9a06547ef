// file: src/pipeline/fakes.rs
// description: in-memory service doubles for pipeline tests

use crate::error::{HarvestError, Result};
use crate::gcp::{IndexStore, ObjectStore, TextDetector};
use crate::indexer::WordImageIndex;
use crate::models::ImageObject;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

/// Object store backed by a map keyed on (bucket, name). Copies and
/// forced failures are recorded for assertions.
#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    copies: Mutex<Vec<(String, String)>>,
    fail_copy_destinations: Mutex<BTreeSet<String>>,
    fail_downloads: Mutex<BTreeSet<String>>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, name: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), name.to_string()), data);
    }

    pub fn get(&self, bucket: &str, name: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .cloned()
    }

    pub fn copies(&self) -> Vec<(String, String)> {
        self.copies.lock().unwrap().clone()
    }

    pub fn fail_copy_to(&self, dest_name: &str) {
        self.fail_copy_destinations
            .lock()
            .unwrap()
            .insert(dest_name.to_string());
    }

    pub fn fail_download_of(&self, name: &str) {
        self.fail_downloads.lock().unwrap().insert(name.to_string());
    }
}

impl ObjectStore for FakeObjectStore {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ImageObject>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, n)| b == bucket && n.starts_with(prefix))
            .map(|(b, n)| ImageObject::new(b, n))
            .collect())
    }

    async fn download(&self, object: &ImageObject) -> Result<Vec<u8>> {
        if self.fail_downloads.lock().unwrap().contains(&object.name) {
            return Err(HarvestError::Storage(format!(
                "canned download failure for {}",
                object.name
            )));
        }
        self.objects
            .lock()
            .unwrap()
            .get(&(object.bucket.clone(), object.name.clone()))
            .cloned()
            .ok_or_else(|| HarvestError::Storage(format!("no such object {}", object.gcs_uri())))
    }

    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        self.put(bucket, name, data);
        Ok(())
    }

    async fn copy(&self, source: &ImageObject, dest_bucket: &str, dest_name: &str) -> Result<()> {
        if self
            .fail_copy_destinations
            .lock()
            .unwrap()
            .contains(dest_name)
        {
            return Err(HarvestError::Storage(format!(
                "canned copy failure for {}",
                dest_name
            )));
        }

        let data = self
            .objects
            .lock()
            .unwrap()
            .get(&(source.bucket.clone(), source.name.clone()))
            .cloned()
            .unwrap_or_default();
        self.put(dest_bucket, dest_name, data);
        self.copies
            .lock()
            .unwrap()
            .push((source.gcs_uri(), format!("gs://{}/{}", dest_bucket, dest_name)));
        Ok(())
    }
}

/// Detector returning canned annotations per image URI.
#[derive(Default)]
pub struct CannedDetector {
    annotations: HashMap<String, Vec<String>>,
    failures: BTreeSet<String>,
}

impl CannedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, uri: &str, annotations: &[&str]) -> Self {
        self.annotations.insert(
            uri.to_string(),
            annotations.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    pub fn failing_for(mut self, uri: &str) -> Self {
        self.failures.insert(uri.to_string());
        self
    }
}

impl TextDetector for CannedDetector {
    async fn detect_text(&self, image_uri: &str) -> Result<Vec<String>> {
        if self.failures.contains(image_uri) {
            return Err(HarvestError::Vision(format!(
                "canned detection failure for {}",
                image_uri
            )));
        }
        Ok(self.annotations.get(image_uri).cloned().unwrap_or_default())
    }
}

/// Index store keeping both maps in memory, with save counting and
/// per-save failure injection.
#[derive(Default)]
pub struct MemoryIndexStore {
    index: Mutex<WordImageIndex>,
    saves: Mutex<usize>,
    failing_saves: Mutex<BTreeSet<usize>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: WordImageIndex) -> Self {
        Self {
            index: Mutex::new(index),
            ..Self::default()
        }
    }

    /// Makes the n-th save call fail (1-based).
    pub fn fail_save_number(&self, n: usize) {
        self.failing_saves.lock().unwrap().insert(n);
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    pub fn snapshot(&self) -> WordImageIndex {
        self.index.lock().unwrap().clone()
    }
}

impl IndexStore for MemoryIndexStore {
    async fn load(&self) -> Result<WordImageIndex> {
        Ok(self.index.lock().unwrap().clone())
    }

    async fn save(&self, index: &WordImageIndex) -> Result<()> {
        let n = {
            let mut saves = self.saves.lock().unwrap();
            *saves += 1;
            *saves
        };

        if self.failing_saves.lock().unwrap().contains(&n) {
            return Err(HarvestError::DocStore(format!("canned save failure #{}", n)));
        }

        *self.index.lock().unwrap() = index.clone();
        Ok(())
    }
}
