//! Concurrent crawl engine
//!
//! The crawler runs three kinds of tasks connected by bounded channels:
//!
//! - **Scrapers** pull URLs, apply the rate limiter and call
//!   [`Spider::scrape`], yielding items and newly discovered URLs.
//! - **Processors** hand each item to [`Spider::process`].
//! - A single **coordinator** passes every start and discovered URL through
//!   the run's [`VisitedSet`], keeps the new ones in a backlog and hands
//!   them to the scrapers as queue slots free up.
//!
//! # Examples
//!
//! ```ignore
//! use listing_harvest::{Crawler, Spider};
//! use std::sync::Arc;
//!
//! let crawler = Crawler::builder()
//!     .crawling_concurrency(4)
//!     .rate_limit(5.0)
//!     .build()?;
//!
//! let stats = crawler.crawl(Arc::new(MySpider::new())).await;
//! tracing::info!(visited = stats.urls_visited, "done");
//! ```
//!
//! # Cancellation
//!
//! [`Crawler::crawl_with_cancellation`] stops queueing new URLs once the
//! token fires; URLs already queued but not started are skipped and
//! in-flight scrapes are allowed to finish.

mod completion;
mod limiter;
mod observer;
mod stats;
mod visited;

pub use completion::CompletionDetector;
pub use limiter::{DelayLimiter, RateLimiter, RateLimiterConfig, TokenBucketLimiter};
pub use observer::{CrawlObserver, ObserverRegistry};
pub use stats::{CrawlStats, StatsTracker};
pub use visited::{UrlNormalizer, VisitedSet};

use std::{collections::VecDeque, fmt::Display, sync::Arc, time::Duration};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::ConfigError;

/// Result of visiting a URL during crawling
#[derive(Debug, Clone)]
pub struct VisitResult {
    /// The URL that was visited
    pub visited_url: String,
    /// New URLs discovered on the page
    pub discovered_urls: Vec<String>,
}

impl VisitResult {
    pub fn new(visited_url: String, discovered_urls: Vec<String>) -> Self {
        Self {
            visited_url,
            discovered_urls,
        }
    }

    pub fn empty(visited_url: String) -> Self {
        Self::new(visited_url, Vec::new())
    }
}

/// Trait for implementing web spiders
///
/// A spider names its start URLs, turns one fetched URL into items plus
/// further URLs, and consumes the items.
#[async_trait::async_trait]
pub trait Spider: Send + Sync {
    /// The type of items extracted from pages
    type Item: Send + 'static;
    /// The error type for spider operations
    type Error: Display + Send + 'static;

    /// URLs queued before anything is scraped
    fn start_urls(&self) -> Vec<String>;

    /// Scrape a URL, returning `(items, new_urls)`
    async fn scrape(&self, url: String) -> Result<(Vec<Self::Item>, Vec<String>), Self::Error>;

    /// Consume one extracted item. Default implementation drops it.
    async fn process(&self, _item: Self::Item) -> Result<(), Self::Error> {
        Ok(())
    }
}

const DEFAULT_CRAWLING_QUEUE_MULTIPLIER: usize = 400;
const DEFAULT_PROCESSING_QUEUE_MULTIPLIER: usize = 10;
const DEFAULT_DELAY_MS: u64 = 200;
const DEFAULT_CRAWLING_CONCURRENCY: usize = 2;
const DEFAULT_PROCESSING_CONCURRENCY: usize = 2;

/// Validated configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub(crate) crawling_concurrency: usize,
    pub(crate) processing_concurrency: usize,
    pub(crate) crawling_queue_multiplier: usize,
    pub(crate) processing_queue_multiplier: usize,
    pub(crate) rate_limiter: RateLimiterConfig,
}

impl CrawlerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawling_concurrency == 0 {
            return Err(ConfigError::InvalidCrawlingConcurrency(0));
        }
        if self.processing_concurrency == 0 {
            return Err(ConfigError::InvalidProcessingConcurrency(0));
        }
        if self.crawling_queue_multiplier == 0 || self.processing_queue_multiplier == 0 {
            return Err(ConfigError::InvalidQueueMultiplier(0));
        }
        Ok(())
    }

    pub fn crawling_queue_capacity(&self) -> usize {
        self.crawling_concurrency * self.crawling_queue_multiplier
    }

    pub fn processing_queue_capacity(&self) -> usize {
        self.processing_concurrency * self.processing_queue_multiplier
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            crawling_concurrency: DEFAULT_CRAWLING_CONCURRENCY,
            processing_concurrency: DEFAULT_PROCESSING_CONCURRENCY,
            crawling_queue_multiplier: DEFAULT_CRAWLING_QUEUE_MULTIPLIER,
            processing_queue_multiplier: DEFAULT_PROCESSING_QUEUE_MULTIPLIER,
            rate_limiter: RateLimiterConfig::Delay(Duration::from_millis(DEFAULT_DELAY_MS)),
        }
    }
}

/// Web crawler that manages concurrent scraping and processing
///
/// A `Crawler` holds configuration and observers only. Dedup, stats and
/// completion state belong to a single crawl, so one crawler can run any
/// number of crawls one after another.
pub struct Crawler {
    config: CrawlerConfig,
    observers: Arc<ObserverRegistry>,
}

/// State shared by the tasks of one crawl
struct CrawlRun {
    visited: Arc<VisitedSet>,
    stats: StatsTracker,
    completion: CompletionDetector,
    observers: Arc<ObserverRegistry>,
}

impl CrawlRun {
    /// Pass each URL through the dedup gate and append the new ones to `backlog`
    async fn admit(&self, urls: Vec<String>, backlog: &mut VecDeque<String>) {
        for url in urls {
            if !self.visited.try_visit(&url) {
                debug!(url = %url, "already visited");
                continue;
            }

            self.completion.url_queued();
            self.observers.notify_url_queued(&url).await;
            backlog.push_back(url);
        }
    }

    async fn record_visit(&self, result: &VisitResult) {
        self.observers.notify_url_visited(result).await;
        self.stats.url_visited();
    }
}

impl Crawler {
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::default()
    }

    /// Crawl until every reachable URL has been visited and every item processed
    pub async fn crawl<T, E>(&self, spider: Arc<dyn Spider<Item = T, Error = E>>) -> CrawlStats
    where
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.crawl_with_cancellation(spider, CancellationToken::new())
            .await
    }

    /// Like [`Crawler::crawl`] but stops early once `cancel_token` fires
    pub async fn crawl_with_cancellation<T, E>(
        &self,
        spider: Arc<dyn Spider<Item = T, Error = E>>,
        cancel_token: CancellationToken,
    ) -> CrawlStats
    where
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        self.crawl_seeded(spider, Arc::new(VisitedSet::new()), cancel_token)
            .await
    }

    /// Crawl with a caller-owned dedup gate
    ///
    /// URLs already in `visited` are never scraped. The caller uses this to
    /// fetch some pages itself before the crawl and to inspect the gate after.
    pub async fn crawl_seeded<T, E>(
        &self,
        spider: Arc<dyn Spider<Item = T, Error = E>>,
        visited: Arc<VisitedSet>,
        cancel_token: CancellationToken,
    ) -> CrawlStats
    where
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let run = Arc::new(CrawlRun {
            visited,
            stats: StatsTracker::new(),
            completion: CompletionDetector::new(),
            observers: self.observers.clone(),
        });

        let (urls_to_visit_tx, urls_to_visit_rx) =
            mpsc::channel::<String>(self.config.crawling_queue_capacity());
        let (items_tx, items_rx) = mpsc::channel(self.config.processing_queue_capacity());
        let (new_urls_tx, new_urls_rx) =
            mpsc::channel::<VisitResult>(self.config.crawling_queue_capacity());

        let processor_handle = self.launch_processors(spider.clone(), run.clone(), items_rx);
        let scraper_handle = self.launch_scrapers(
            spider.clone(),
            run.clone(),
            urls_to_visit_rx,
            new_urls_tx,
            items_tx,
            self.config.rate_limiter.build(),
            cancel_token.clone(),
        );

        self.coordinate_crawl(
            &run,
            spider.start_urls(),
            urls_to_visit_tx,
            new_urls_rx,
            cancel_token,
        )
        .await;

        if let Err(e) = scraper_handle.await {
            error!(error = %e, "scraper task panicked");
        }
        if let Err(e) = processor_handle.await {
            error!(error = %e, "processor task panicked");
        }

        let final_stats = run.stats.snapshot();
        self.observers.notify_crawl_complete(&final_stats).await;
        final_stats
    }

    /// Feed the scrapers and fold their results back into the backlog
    ///
    /// Admitted URLs wait in an unbounded backlog and move to the bounded
    /// scraper queue only when a slot is free. The coordinator therefore
    /// never blocks on a full queue while scrapers block on a full result
    /// channel, however many URLs a page or the seed list yields.
    async fn coordinate_crawl(
        &self,
        run: &CrawlRun,
        start_urls: Vec<String>,
        urls_to_visit_tx: mpsc::Sender<String>,
        mut new_urls_rx: mpsc::Receiver<VisitResult>,
        cancel_token: CancellationToken,
    ) {
        let mut backlog = VecDeque::new();
        run.admit(start_urls, &mut backlog).await;

        while !run.completion.is_idle() {
            tokio::select! {
                result = new_urls_rx.recv() => {
                    let Some(result) = result else {
                        break;
                    };

                    run.record_visit(&result).await;
                    if !cancel_token.is_cancelled() {
                        run.admit(result.discovered_urls, &mut backlog).await;
                    }
                    run.completion.url_completed();
                }

                permit = urls_to_visit_tx.reserve(), if !backlog.is_empty() => {
                    let Ok(permit) = permit else {
                        warn!(unscheduled = backlog.len(), "scrapers are gone");
                        break;
                    };
                    if let Some(url) = backlog.pop_front() {
                        permit.send(url);
                    }
                }

                _ = cancel_token.cancelled() => {
                    debug!(unscheduled = backlog.len(), "crawl cancelled, no further URLs are queued");
                    break;
                }
            }
        }

        drop(urls_to_visit_tx);

        // let in-flight scrapers deliver their results so none blocks on a full channel
        while let Some(result) = new_urls_rx.recv().await {
            run.record_visit(&result).await;
            run.completion.url_completed();
        }
    }

    fn launch_processors<T, E>(
        &self,
        spider: Arc<dyn Spider<Item = T, Error = E>>,
        run: Arc<CrawlRun>,
        items: mpsc::Receiver<(String, T)>,
    ) -> tokio::task::JoinHandle<()>
    where
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let concurrency = self.config.processing_concurrency;

        tokio::spawn(async move {
            ReceiverStream::new(items)
                .for_each_concurrent(concurrency, |(source_url, item)| {
                    let spider = spider.clone();
                    let run = run.clone();

                    async move {
                        match spider.process(item).await {
                            Ok(()) => {
                                run.stats.item_extracted();
                                run.observers.notify_item_extracted(&source_url).await;
                            }
                            Err(err) => {
                                let error_msg = err.to_string();
                                warn!(url = %source_url, error = %error_msg, "failed to process item");
                                run.stats.error_encountered();
                                run.observers
                                    .notify_process_error(&source_url, &error_msg)
                                    .await;
                            }
                        }
                    }
                })
                .await;
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn launch_scrapers<T, E>(
        &self,
        spider: Arc<dyn Spider<Item = T, Error = E>>,
        run: Arc<CrawlRun>,
        urls_to_visit: mpsc::Receiver<String>,
        new_urls_tx: mpsc::Sender<VisitResult>,
        items_tx: mpsc::Sender<(String, T)>,
        rate_limiter: Arc<dyn RateLimiter>,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<()>
    where
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let concurrency = self.config.crawling_concurrency;

        tokio::spawn(async move {
            ReceiverStream::new(urls_to_visit)
                .for_each_concurrent(concurrency, |queued_url| {
                    let spider = spider.clone();
                    let run = run.clone();
                    let new_urls_tx = new_urls_tx.clone();
                    let items_tx = items_tx.clone();
                    let rate_limiter = rate_limiter.clone();
                    let cancel_token = cancel_token.clone();

                    async move {
                        run.completion.scraper_started();
                        let mut discovered_urls = Vec::new();

                        if cancel_token.is_cancelled() {
                            debug!(url = %queued_url, "skipping queued URL after cancellation");
                        } else {
                            rate_limiter.acquire().await;

                            match spider.scrape(queued_url.clone()).await {
                                Ok((items, new_urls)) => {
                                    for item in items {
                                        if items_tx.send((queued_url.clone(), item)).await.is_err() {
                                            error!(url = %queued_url, "item channel closed");
                                            run.stats.error_encountered();
                                        }
                                    }
                                    discovered_urls = new_urls;
                                }
                                Err(err) => {
                                    let error_msg = err.to_string();
                                    warn!(url = %queued_url, error = %error_msg, "failed to scrape");
                                    run.stats.error_encountered();
                                    run.observers
                                        .notify_scrape_error(&queued_url, &error_msg)
                                        .await;
                                }
                            }
                        }

                        // finish before reporting, so the coordinator never sees
                        // zero pending URLs while this scraper still counts as active
                        run.completion.scraper_finished();

                        let result = VisitResult::new(queued_url, discovered_urls);
                        if new_urls_tx.send(result).await.is_err() {
                            debug!("coordinator gone, dropping visit result");
                        }
                    }
                })
                .await;
        })
    }
}

/// Builder for configuring a Crawler
#[derive(Default)]
pub struct CrawlerBuilder {
    config: CrawlerConfig,
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl CrawlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of concurrent scraping tasks (default: 2)
    pub fn crawling_concurrency(mut self, concurrency: usize) -> Self {
        self.config.crawling_concurrency = concurrency;
        self
    }

    /// Set the number of concurrent processing tasks (default: 2)
    pub fn processing_concurrency(mut self, concurrency: usize) -> Self {
        self.config.processing_concurrency = concurrency;
        self
    }

    /// Crawling queue capacity is `crawling_concurrency * multiplier` (default: 400)
    pub fn crawling_queue_multiplier(mut self, multiplier: usize) -> Self {
        self.config.crawling_queue_multiplier = multiplier;
        self
    }

    /// Processing queue capacity is `processing_concurrency * multiplier` (default: 10)
    pub fn processing_queue_multiplier(mut self, multiplier: usize) -> Self {
        self.config.processing_queue_multiplier = multiplier;
        self
    }

    /// Set the delay between requests (default: 200ms)
    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.rate_limiter = RateLimiterConfig::Delay(delay);
        self
    }

    /// Set rate limiting using token bucket algorithm
    pub fn rate_limit(mut self, requests_per_second: f64) -> Self {
        self.config.rate_limiter = RateLimiterConfig::TokenBucket {
            requests_per_second,
        };
        self
    }

    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limiter = RateLimiterConfig::None;
        self
    }

    /// Register an observer to receive crawl events
    pub fn observe_with(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> Result<Crawler, ConfigError> {
        self.config.validate()?;

        let mut registry = ObserverRegistry::new();
        for observer in self.observers {
            registry.register(observer);
        }

        Ok(Crawler {
            config: self.config,
            observers: Arc::new(registry),
        })
    }
}
