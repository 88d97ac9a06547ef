// file: src/exporter/json.rs
// description: json export of the word/image index with a run manifest

use crate::error::Result;
use crate::indexer::WordImageIndex;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;

const WORD_MAP_FILE: &str = "word_to_images.json";
const IMAGE_MAP_FILE: &str = "image_to_words.json";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone)]
pub struct JsonExporter {
    output_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ExportManifest {
    pub exported_at: String,
    pub total_words: usize,
    pub total_images: usize,
    pub files: Vec<String>,
}

impl JsonExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    /// Writes both maps and a manifest into the output directory. Keys
    /// are written sorted, so exporting the same index twice produces
    /// identical files.
    pub fn export_index(&self, index: &WordImageIndex, pretty: bool) -> Result<ExportManifest> {
        info!("Starting JSON export to {:?}", self.output_dir);

        let word_map: BTreeMap<&String, &Vec<String>> = index.word_to_images.iter().collect();
        let image_map: BTreeMap<&String, &Vec<String>> = index.image_to_words.iter().collect();

        self.write_json(WORD_MAP_FILE, &word_map, pretty)?;
        self.write_json(IMAGE_MAP_FILE, &image_map, pretty)?;

        let manifest = ExportManifest {
            exported_at: Utc::now().to_rfc3339(),
            total_words: index.word_count(),
            total_images: index.image_count(),
            files: vec![WORD_MAP_FILE.to_string(), IMAGE_MAP_FILE.to_string()],
        };
        self.write_json(MANIFEST_FILE, &manifest, pretty)?;

        info!(
            "Export complete: {} words, {} images",
            manifest.total_words, manifest.total_images
        );
        Ok(manifest)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T, pretty: bool) -> Result<()> {
        let path = self.output_dir.join(name);
        let contents = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        fs::write(&path, contents)?;
        Ok(())
    }
}
