// file: src/indexer/index.rs
// description: bidirectional word-to-image index with configurable merge semantics
// reference: internal data structures

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// How a new image URL is merged into a word's URL list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeSemantics {
    /// Append unconditionally; reprocessing the same image accumulates
    /// duplicate URLs, which doubles as a crude frequency signal.
    Append,
    /// Append only when the URL is not already listed for the word.
    Dedup,
}

impl Default for MergeSemantics {
    fn default() -> Self {
        MergeSemantics::Append
    }
}

/// A word ranked by how many image URLs reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopWord {
    pub word: String,
    pub images: usize,
}

/// One direction of a consistency violation between the two maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub word: String,
    pub url: String,
}

/// Result of cross-checking the two maps against each other.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyReport {
    /// Words listed for an image that do not list that image back.
    /// These break the index contract outright.
    pub missing_in_word_map: Vec<Violation>,
    /// URLs listed for a word whose image entry no longer carries the word.
    /// Arises when an image is re-indexed with a smaller word set; stale
    /// entries are never removed, so these are advisory.
    pub missing_in_image_map: Vec<Violation>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_in_word_map.is_empty()
    }
}

/// Twin maps associating OCR-extracted words with the image URLs they were
/// found in, and each image URL with its word set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordImageIndex {
    pub word_to_images: HashMap<String, Vec<String>>,
    pub image_to_words: HashMap<String, Vec<String>>,
}

impl WordImageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the word set of one image. The image entry is overwritten
    /// wholesale, so re-indexing the same image is idempotent on that side;
    /// the word side merges according to `semantics`.
    pub fn index_image(&mut self, url: &str, words: &BTreeSet<String>, semantics: MergeSemantics) {
        for word in words {
            let urls = self.word_to_images.entry(word.clone()).or_default();
            match semantics {
                MergeSemantics::Append => urls.push(url.to_string()),
                MergeSemantics::Dedup => {
                    if !urls.iter().any(|existing| existing == url) {
                        urls.push(url.to_string());
                    }
                }
            }
        }

        self.image_to_words
            .insert(url.to_string(), words.iter().cloned().collect());
    }

    pub fn word_count(&self) -> usize {
        self.word_to_images.len()
    }

    pub fn image_count(&self) -> usize {
        self.image_to_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_to_images.is_empty() && self.image_to_words.is_empty()
    }

    /// The most widely occurring words, ranked by number of referencing
    /// image URLs (ties broken alphabetically). Words of one or two
    /// characters carry no signal for diagram search and are skipped.
    pub fn top_words(&self, n: usize) -> Vec<TopWord> {
        let mut ranked: Vec<TopWord> = self
            .word_to_images
            .iter()
            .filter(|(word, _)| word.len() > 2)
            .map(|(word, urls)| TopWord {
                word: word.clone(),
                images: urls.len(),
            })
            .collect();

        ranked.sort_by(|a, b| b.images.cmp(&a.images).then_with(|| a.word.cmp(&b.word)));
        ranked.truncate(n);
        ranked
    }

    /// Cross-check the two maps. Every word attributed to an image must list
    /// that image's URL, and every URL under a word should still carry the
    /// word in its image entry.
    pub fn check_consistency(&self) -> ConsistencyReport {
        let mut report = ConsistencyReport::default();

        for (url, words) in &self.image_to_words {
            for word in words {
                let listed = self
                    .word_to_images
                    .get(word)
                    .map(|urls| urls.iter().any(|u| u == url))
                    .unwrap_or(false);
                if !listed {
                    report.missing_in_word_map.push(Violation {
                        word: word.clone(),
                        url: url.clone(),
                    });
                }
            }
        }

        for (word, urls) in &self.word_to_images {
            for url in urls {
                let listed = self
                    .image_to_words
                    .get(url)
                    .map(|words| words.iter().any(|w| w == word))
                    .unwrap_or(false);
                if !listed {
                    report.missing_in_image_map.push(Violation {
                        word: word.clone(),
                        url: url.clone(),
                    });
                }
            }
        }

        report.missing_in_word_map.sort_by(|a, b| (&a.url, &a.word).cmp(&(&b.url, &b.word)));
        report.missing_in_image_map.sort_by(|a, b| (&a.word, &a.url).cmp(&(&b.word, &b.url)));
        report
    }
}
