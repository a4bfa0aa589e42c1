use std::sync::Arc;

use super::{CrawlStats, VisitResult};

/// Hooks into the lifecycle of a crawl
///
/// Every hook has an empty default. Item events carry the URL of the page
/// the item was scraped from, so an observer can attribute records and
/// failures to listings without knowing the spider's item type.
///
/// # Example
///
/// ```ignore
/// use listing_harvest::CrawlObserver;
///
/// struct Progress;
///
/// #[async_trait::async_trait]
/// impl CrawlObserver for Progress {
///     async fn on_item_extracted(&self, source_url: &str) {
///         tracing::debug!(url = source_url, "record stored");
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait CrawlObserver: Send + Sync {
    /// A URL passed the dedup gate
    async fn on_url_queued(&self, _url: &str) {}

    /// A URL was scraped, successfully or not
    async fn on_url_visited(&self, _result: &VisitResult) {}

    /// An item scraped from `source_url` was processed
    async fn on_item_extracted(&self, _source_url: &str) {}

    async fn on_scrape_error(&self, _url: &str, _error: &str) {}

    /// Processing an item scraped from `source_url` failed
    async fn on_process_error(&self, _source_url: &str, _error: &str) {}

    /// Called once, with the final stats
    async fn on_crawl_complete(&self, _stats: &CrawlStats) {}
}

/// Fans each crawl event out to the registered observers, in registration order
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn CrawlObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub async fn notify_url_queued(&self, url: &str) {
        for observer in &self.observers {
            observer.on_url_queued(url).await;
        }
    }

    pub async fn notify_url_visited(&self, result: &VisitResult) {
        for observer in &self.observers {
            observer.on_url_visited(result).await;
        }
    }

    pub async fn notify_item_extracted(&self, source_url: &str) {
        for observer in &self.observers {
            observer.on_item_extracted(source_url).await;
        }
    }

    pub async fn notify_scrape_error(&self, url: &str, error: &str) {
        for observer in &self.observers {
            observer.on_scrape_error(url, error).await;
        }
    }

    pub async fn notify_process_error(&self, source_url: &str, error: &str) {
        for observer in &self.observers {
            observer.on_process_error(source_url, error).await;
        }
    }

    pub async fn notify_crawl_complete(&self, stats: &CrawlStats) {
        for observer in &self.observers {
            observer.on_crawl_complete(stats).await;
        }
    }
}
