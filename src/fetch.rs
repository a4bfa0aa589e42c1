//! Page retrieval with bounded retries

use std::time::Duration;

use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{ConfigError, FetchError};

const USER_AGENT: &str = concat!("listing-harvest/", env!("CARGO_PKG_VERSION"));
const MAX_BACKOFF_SHIFT: u32 = 5;

/// Source of raw HTML for a URL
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// How often and how patiently a failed fetch is retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidRetryAttempts(max_attempts));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (1-based), doubling each time
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay
            .saturating_mul(1 << shift)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Fetch `url`, retrying transient failures according to `policy`
///
/// Non-retryable errors (a 404, say) come back after the first attempt.
/// When every attempt fails the last error is wrapped in
/// [`FetchError::Exhausted`].
pub async fn fetch_with_retry<F>(fetcher: &F, url: &str, policy: &RetryPolicy) -> Result<String, FetchError>
where
    F: Fetcher + ?Sized,
{
    let mut attempt = 1;
    loop {
        match fetcher.fetch(url).await {
            Ok(body) => return Ok(body),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= policy.max_attempts => {
                warn!(url, attempts = attempt, error = %err, "giving up on resource");
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.backoff(attempt);
                warn!(url, attempt, ?delay, error = %err, "fetch failed, retrying");
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// [`Fetcher`] backed by a reqwest client
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("could not build HTTP client: {}", e),
                retryable: false,
            })?;

        Ok(Self { client })
    }

    fn transport_error(url: &str, err: reqwest::Error) -> FetchError {
        let retryable = err.is_timeout() || err.is_connect() || err.is_body() || err.is_request();
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
            retryable,
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| Self::transport_error(url, e))
    }
}
