use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use scraper::Html;
use tracing::{debug, info, warn};

use super::links::listing_links;
use crate::{
    ExtractedListing, FetchError, FieldIssue, RecordSink, RetryPolicy, Spider,
    extractor::extract_listing,
    fetch::{Fetcher, fetch_with_retry},
};

/// Spider over the catalog's index pages and the listings they link to
///
/// Index pages produce listing URLs, listing pages produce one record
/// each. Anything not scheduled as an index page is treated as a listing.
pub struct ListingSpider {
    fetcher: Arc<dyn Fetcher>,
    retry: RetryPolicy,
    sink: Arc<dyn RecordSink>,
    index_urls: HashSet<String>,
    start_urls: Vec<String>,
    failed: Mutex<Vec<String>>,
    unattributed_values: AtomicUsize,
    field_issues: AtomicUsize,
}

impl ListingSpider {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        retry: RetryPolicy,
        sink: Arc<dyn RecordSink>,
        index_urls: Vec<String>,
        seed_listings: Vec<String>,
    ) -> Self {
        let mut start_urls = index_urls.clone();
        start_urls.extend(seed_listings);

        Self {
            fetcher,
            retry,
            sink,
            index_urls: index_urls.into_iter().collect(),
            start_urls,
            failed: Mutex::new(Vec::new()),
            unattributed_values: AtomicUsize::new(0),
            field_issues: AtomicUsize::new(0),
        }
    }

    /// URLs that could not be fetched, in failure order
    pub fn failed_urls(&self) -> Vec<String> {
        self.failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn unattributed_values(&self) -> usize {
        self.unattributed_values.load(Ordering::Relaxed)
    }

    pub fn field_issues(&self) -> usize {
        self.field_issues.load(Ordering::Relaxed)
    }

    fn record_failure(&self, err: &FetchError) {
        self.failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err.url().to_string());
    }
}

#[async_trait::async_trait]
impl Spider for ListingSpider {
    type Item = ExtractedListing;
    type Error = FetchError;

    fn start_urls(&self) -> Vec<String> {
        self.start_urls.clone()
    }

    async fn scrape(&self, url: String) -> Result<(Vec<Self::Item>, Vec<String>), Self::Error> {
        let body = fetch_with_retry(self.fetcher.as_ref(), &url, &self.retry)
            .await
            .inspect_err(|err| self.record_failure(err))?;

        // Html is not Send, so parse and drop it before the next await
        let document = Html::parse_document(&body);
        if self.index_urls.contains(&url) {
            let links = listing_links(&document.root_element(), &url);
            info!(url = %url, listings = links.len(), "index page scanned");
            Ok((Vec::new(), links))
        } else {
            let listing = extract_listing(&document.root_element(), &url);
            Ok((vec![listing], Vec::new()))
        }
    }

    async fn process(&self, listing: Self::Item) -> Result<(), Self::Error> {
        let url = &listing.property.source_url;
        for issue in &listing.issues {
            match issue {
                FieldIssue::Unattributed { value } => {
                    self.unattributed_values.fetch_add(1, Ordering::Relaxed);
                    warn!(url = %url, value = %value, "price without currency prefix, left unset");
                }
                other => warn!(url = %url, issue = %other, "field skipped"),
            }
        }
        self.field_issues
            .fetch_add(listing.issues.len(), Ordering::Relaxed);

        debug!(url = %url, "record complete");
        self.sink.append(listing.property);
        Ok(())
    }
}

