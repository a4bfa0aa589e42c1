use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::Context;
use clap::Parser;
use listing_harvest::{
    Catalog, CatalogConfig, CrawlObserver, CrawlStats, Crawler, HttpFetcher, MemorySink,
    RetryPolicy, VisitResult, save_csv,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crawl a real-estate catalog and export every listing to CSV
#[derive(Debug, Parser)]
#[command(name = "listing-harvest", version)]
struct Cli {
    /// Output CSV path
    #[arg(short, long, env = "HARVEST_OUTPUT", default_value = "listings.csv")]
    output: PathBuf,

    #[arg(long, env = "HARVEST_SITE", default_value = "https://chilepropiedades.cl")]
    site: String,

    #[arg(long, env = "HARVEST_OPERATION", default_value = "venta")]
    operation: String,

    #[arg(long, env = "HARVEST_CATEGORY", default_value = "casa")]
    category: String,

    #[arg(long, env = "HARVEST_REGION", default_value = "region-metropolitana-de-santiago-rm")]
    region: String,

    /// Pages fetched in parallel
    #[arg(long, env = "HARVEST_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Pause before each request, in milliseconds
    #[arg(long, env = "HARVEST_DELAY_MS", default_value_t = 200)]
    delay_ms: u64,

    /// Attempts per page before it is given up
    #[arg(long, env = "HARVEST_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Per-request timeout, in seconds
    #[arg(long, env = "HARVEST_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,
}

/// Logs crawl progress every `every` visited pages
struct ProgressObserver {
    visited: AtomicUsize,
    records: AtomicUsize,
    every: usize,
}

#[async_trait::async_trait]
impl CrawlObserver for ProgressObserver {
    async fn on_url_visited(&self, _result: &VisitResult) {
        let visited = self.visited.fetch_add(1, Ordering::Relaxed) + 1;
        if visited % self.every == 0 {
            let records = self.records.load(Ordering::Relaxed);
            info!(visited, records, "crawl progress");
        }
    }

    async fn on_item_extracted(&self, source_url: &str) {
        self.records.fetch_add(1, Ordering::Relaxed);
        debug!(url = source_url, "record stored");
    }

    async fn on_crawl_complete(&self, stats: &CrawlStats) {
        info!(
            urls_per_second = stats.urls_per_second(),
            errors = stats.errors_encountered,
            "crawler finished"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listing_harvest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = CatalogConfig {
        site: cli.site,
        operation: cli.operation,
        category: cli.category,
        region: cli.region,
    };
    let retry = RetryPolicy::new(
        cli.max_attempts,
        Duration::from_millis(500),
        Duration::from_secs(10),
    )?;
    let fetcher = HttpFetcher::new(Duration::from_secs(cli.timeout_secs))?;

    let crawler = Crawler::builder()
        .crawling_concurrency(cli.concurrency)
        .processing_concurrency(cli.concurrency)
        .delay(Duration::from_millis(cli.delay_ms))
        .observe_with(Arc::new(ProgressObserver {
            visited: AtomicUsize::new(0),
            records: AtomicUsize::new(0),
            every: 50,
        }))
        .build()?;

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing in-flight pages");
            ctrl_c_token.cancel();
        }
    });

    let catalog = Catalog::new(config, Arc::new(fetcher)).with_retry(retry);
    let sink = Arc::new(MemorySink::new());
    let report = catalog
        .run_with_cancellation(&crawler, sink.clone(), cancel_token)
        .await?;

    for url in &report.failed_urls {
        warn!(url = %url, "excluded after failed fetches");
    }

    let records = sink.drain_sorted();
    save_csv(&cli.output, &records)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    info!(
        records = records.len(),
        last_page = report.last_page,
        output = %cli.output.display(),
        "export written"
    );

    Ok(())
}
