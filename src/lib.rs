// Core modules
mod backend;
pub mod catalog;
pub mod crawler;
mod error;
pub mod export;
pub mod extractor;
pub mod fetch;
pub mod normalize;
mod property;
mod sink;

// Public exports
pub use backend::HtmlNode;
pub use catalog::{Catalog, CatalogConfig, CrawlReport, CrawlState, ListingSpider};
pub use crawler::{
    CompletionDetector, CrawlObserver, CrawlStats, Crawler, CrawlerBuilder, CrawlerConfig,
    DelayLimiter, ObserverRegistry, RateLimiter, RateLimiterConfig, Spider, StatsTracker,
    TokenBucketLimiter, UrlNormalizer, VisitResult, VisitedSet,
};
pub use error::{CatalogError, ConfigError, ExportError, FetchError, FormatError, StructureError};
pub use export::{save_csv, write_csv};
pub use extractor::{ExtractedListing, FieldIssue, extract_listing};
pub use fetch::{Fetcher, HttpFetcher, RetryPolicy, fetch_with_retry};
pub use property::{DIRECT_OWNER, Property, split_location};
pub use sink::{MemorySink, RecordSink};
