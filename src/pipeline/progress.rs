// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for pipeline execution
// reference: uses indicatif for progress bars and tracks processing metrics

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub images_processed: usize,
    pub images_failed: usize,
    pub words_indexed: usize,
    pub persist_failures: usize,
    pub duration_secs: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images_per_second(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        self.images_processed as f64 / self.duration_secs as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.images_processed + self.images_failed;
        if total == 0 {
            return 0.0;
        }
        (self.images_processed as f64 / total as f64) * 100.0
    }
}

pub struct ProgressTracker {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    images_processed: Arc<AtomicUsize>,
    images_failed: Arc<AtomicUsize>,
    words_indexed: Arc<AtomicUsize>,
    persist_failures: Arc<AtomicUsize>,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total_images: usize) -> Self {
        Self::with_color(total_images, true)
    }

    pub fn with_color(total_images: usize, colored: bool) -> Self {
        let multi_progress = MultiProgress::new();

        let main_bar = create_progress_bar(&multi_progress, total_images as u64, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            images_processed: Arc::new(AtomicUsize::new(0)),
            images_failed: Arc::new(AtomicUsize::new(0)),
            words_indexed: Arc::new(AtomicUsize::new(0)),
            persist_failures: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_images_processed(&self) {
        self.images_processed.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn inc_images_failed(&self) {
        self.images_failed.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn add_words(&self, count: usize) {
        self.words_indexed.fetch_add(count, Ordering::SeqCst);
    }

    pub fn inc_persist_failures(&self) {
        self.persist_failures.fetch_add(1, Ordering::SeqCst);
        self.update_detail_bar();
    }

    pub fn set_message(&self, message: String) {
        self.detail_bar.set_message(message);
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Indexing complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> PipelineStats {
        let duration = self.start_time.elapsed().as_secs();

        PipelineStats {
            images_processed: self.images_processed.load(Ordering::SeqCst),
            images_failed: self.images_failed.load(Ordering::SeqCst),
            words_indexed: self.words_indexed.load(Ordering::SeqCst),
            persist_failures: self.persist_failures.load(Ordering::SeqCst),
            duration_secs: duration,
        }
    }

    fn update_detail_bar(&self) {
        let words = self.words_indexed.load(Ordering::SeqCst);
        let failed = self.images_failed.load(Ordering::SeqCst);

        let message = format!("Words: {} | Failed: {}", words, failed);

        self.detail_bar.set_message(message);
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.finish();
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    if colored {
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
                )
                .expect("Failed to create progress bar template")
                .progress_chars("█▓▒░"),
        );
    } else {
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta}) {msg}")
                .expect("Failed to create progress bar template")
                .progress_chars("=>-"),
        );
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    let style = ProgressStyle::default_bar()
        .template("{msg}")
        .expect("Failed to create detail bar template");
    bar.set_style(style);
    bar
}
