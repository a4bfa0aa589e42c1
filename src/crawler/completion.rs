use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks outstanding work of one crawl
///
/// A URL is pending from the moment it passes the dedup gate until the
/// coordinator has handled its visit result. A scraper is active while it
/// holds a URL. The crawl is done when both counts are zero.
#[derive(Debug, Default)]
pub struct CompletionDetector {
    pending_urls: AtomicUsize,
    active_scrapers: AtomicUsize,
}

impl CompletionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_queued(&self) {
        self.pending_urls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn url_completed(&self) {
        self.pending_urls.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn scraper_started(&self) {
        self.active_scrapers.fetch_add(1, Ordering::SeqCst);
    }

    pub fn scraper_finished(&self) {
        self.active_scrapers.fetch_sub(1, Ordering::SeqCst);
    }

    /// No pending URL and no active scraper
    pub fn is_idle(&self) -> bool {
        self.pending_count() == 0 && self.active_count() == 0
    }

    pub fn pending_count(&self) -> usize {
        self.pending_urls.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.active_scrapers.load(Ordering::SeqCst)
    }
}
