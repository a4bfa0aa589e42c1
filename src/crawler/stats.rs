use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

/// Statistics collected during crawling
#[derive(Debug, Clone)]
pub struct CrawlStats {
    /// Number of URLs visited, failed ones included
    pub urls_visited: usize,
    /// Number of items handed to the spider's `process`
    pub items_extracted: usize,
    /// Scrape and process failures
    pub errors_encountered: usize,
    pub start_time: Instant,
    pub last_update: Instant,
}

impl CrawlStats {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            urls_visited: 0,
            items_extracted: 0,
            errors_encountered: 0,
            start_time: now,
            last_update: now,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.last_update.duration_since(self.start_time)
    }

    pub fn urls_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.urls_visited as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe counters behind [`CrawlStats`]
///
/// Counters are informational, so `Relaxed` ordering is enough.
pub struct StatsTracker {
    urls_visited: AtomicUsize,
    items_extracted: AtomicUsize,
    errors_encountered: AtomicUsize,
    start_time: Instant,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            urls_visited: AtomicUsize::new(0),
            items_extracted: AtomicUsize::new(0),
            errors_encountered: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn url_visited(&self) {
        self.urls_visited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_extracted(&self) {
        self.items_extracted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error_encountered(&self) {
        self.errors_encountered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            urls_visited: self.urls_visited.load(Ordering::Relaxed),
            items_extracted: self.items_extracted.load(Ordering::Relaxed),
            errors_encountered: self.errors_encountered.load(Ordering::Relaxed),
            start_time: self.start_time,
            last_update: Instant::now(),
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
