//! Crawl control for a paginated listing catalog
//!
//! A run has two phases separated by a hard barrier:
//!
//! 1. Index page 0 is fetched and awaited. Its pagination widget gives the
//!    last page number; a failure here aborts the run since nothing else can
//!    be enumerated.
//! 2. Index pages `1..=last_page` and the listings found on page 0 are
//!    handed to the [`Crawler`]. Every URL goes through the crawler's dedup
//!    gate, so page 0 is never fetched twice and a listing linked from two
//!    index pages yields one record.
//!
//! # Examples
//!
//! ```ignore
//! use listing_harvest::{Catalog, CatalogConfig, Crawler, HttpFetcher, MemorySink};
//! use std::sync::Arc;
//!
//! let catalog = Catalog::new(CatalogConfig::default(), Arc::new(HttpFetcher::new(timeout)?));
//! let sink = Arc::new(MemorySink::new());
//! let report = catalog.run(&Crawler::builder().build()?, sink.clone()).await?;
//! save_csv("listings.csv", &sink.drain_sorted())?;
//! ```

mod links;
mod spider;

pub use links::{LISTING_LINK_CLASS, listing_links, pagination_bound};
pub use spider::ListingSpider;

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::{
    CatalogError, ConfigError, CrawlStats, Crawler, RecordSink, RetryPolicy, VisitedSet,
    fetch::{Fetcher, fetch_with_retry},
};

/// Where the catalog lives and which slice of it to crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Site root, e.g. `https://chilepropiedades.cl`
    pub site: String,
    /// `venta` (sale) or `arriendo` (rent)
    pub operation: String,
    /// Property category, e.g. `casa` or `departamento`
    pub category: String,
    pub region: String,
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.site) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(ConfigError::InvalidSiteUrl(self.site.clone())),
        }
    }

    /// URL of index page `page`, counting from 0
    pub fn index_url(&self, page: u32) -> String {
        format!(
            "{}/propiedades/{}/{}/{}/{}",
            self.site.trim_end_matches('/'),
            self.operation,
            self.category,
            self.region,
            page
        )
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            site: "https://chilepropiedades.cl".to_string(),
            operation: "venta".to_string(),
            category: "casa".to_string(),
            region: "region-metropolitana-de-santiago-rm".to_string(),
        }
    }
}

/// State of one catalog run: the dedup gate and the page bound
///
/// Created fresh by every [`Catalog::run`], so a crawler can be reused.
#[derive(Debug, Default)]
pub struct CrawlState {
    visited: Arc<VisitedSet>,
    last_page: AtomicU32,
}

impl CrawlState {
    pub fn new(visited: Arc<VisitedSet>) -> Self {
        Self {
            visited,
            last_page: AtomicU32::new(0),
        }
    }

    pub fn visited(&self) -> &Arc<VisitedSet> {
        &self.visited
    }

    pub fn last_page(&self) -> u32 {
        self.last_page.load(Ordering::SeqCst)
    }

    /// Raise the bound to `page`; a lower value is ignored
    pub fn observe_last_page(&self, page: u32) -> u32 {
        self.last_page.fetch_max(page, Ordering::SeqCst).max(page)
    }
}

/// Outcome of a catalog run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub stats: CrawlStats,
    pub last_page: u32,
    /// Resources that failed every fetch attempt, excluded from the output
    pub failed_urls: Vec<String>,
    /// `Valor:` values whose currency could not be told
    pub unattributed_values: usize,
    pub field_issues: usize,
}

/// Drives a full crawl of one catalog slice
pub struct Catalog {
    config: CatalogConfig,
    fetcher: Arc<dyn Fetcher>,
    retry: RetryPolicy,
}

impl Catalog {
    pub fn new(config: CatalogConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config,
            fetcher,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Crawl the whole catalog, delivering every record to `sink`
    pub async fn run(
        &self,
        crawler: &Crawler,
        sink: Arc<dyn RecordSink>,
    ) -> Result<CrawlReport, CatalogError> {
        self.run_with_cancellation(crawler, sink, CancellationToken::new())
            .await
    }

    pub async fn run_with_cancellation(
        &self,
        crawler: &Crawler,
        sink: Arc<dyn RecordSink>,
        cancel_token: CancellationToken,
    ) -> Result<CrawlReport, CatalogError> {
        self.config.validate()?;
        let state = CrawlState::default();

        let first_url = self.config.index_url(0);
        let claimed = state.visited().try_visit(&first_url);
        debug_assert!(claimed, "a fresh run has visited nothing");

        let body = fetch_with_retry(self.fetcher.as_ref(), &first_url, &self.retry)
            .await
            .map_err(|source| CatalogError::BoundResolution {
                url: first_url.clone(),
                source,
            })?;

        let (bound, seed_listings) = {
            let document = Html::parse_document(&body);
            let root = document.root_element();
            (pagination_bound(&root), listing_links(&root, &first_url))
        };
        let last_page = state.observe_last_page(bound);
        info!(last_page, listings = seed_listings.len(), "pagination bound resolved");

        let index_urls: Vec<String> = (1..=last_page)
            .map(|page| self.config.index_url(page))
            .collect();
        for url in &index_urls {
            debug!(url = %url, "index page scheduled");
        }

        let spider = Arc::new(ListingSpider::new(
            self.fetcher.clone(),
            self.retry.clone(),
            sink,
            index_urls,
            seed_listings,
        ));

        let stats = crawler
            .crawl_seeded(spider.clone(), state.visited().clone(), cancel_token)
            .await;

        let report = CrawlReport {
            stats,
            last_page: state.last_page(),
            failed_urls: spider.failed_urls(),
            unattributed_values: spider.unattributed_values(),
            field_issues: spider.field_issues(),
        };

        info!(
            visited = report.stats.urls_visited,
            records = report.stats.items_extracted,
            failed = report.failed_urls.len(),
            unattributed = report.unattributed_values,
            elapsed = ?report.stats.elapsed(),
            "catalog crawl complete"
        );

        Ok(report)
    }
}
