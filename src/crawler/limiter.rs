//! Politeness: how often the crawler may hit the catalog

use std::time::{Duration, Instant};

use tokio::{sync::Mutex, time::sleep};

/// Trait for implementing rate limiting strategies
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until a request is allowed under the rate limit
    async fn acquire(&self);
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter
///
/// Holds up to one second worth of tokens, so short bursts are allowed while
/// the long-run rate stays at `requests_per_second`.
pub struct TokenBucketLimiter {
    bucket: Mutex<Bucket>,
    capacity: f64,
    refill_rate: f64,
}

impl TokenBucketLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: requests_per_second,
                last_refill: Instant::now(),
            }),
            capacity: requests_per_second,
            refill_rate: requests_per_second,
        }
    }
}

#[async_trait::async_trait]
impl RateLimiter for TokenBucketLimiter {
    async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.capacity);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }

                let missing = 1.0 - bucket.tokens;
                Duration::from_secs_f64((missing / self.refill_rate).max(0.001))
            };

            sleep(wait).await;
        }
    }
}

/// Fixed pause before every request
pub struct DelayLimiter {
    delay: Duration,
}

impl DelayLimiter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait::async_trait]
impl RateLimiter for DelayLimiter {
    async fn acquire(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

/// Configuration for rate limiting strategy
#[derive(Debug, Clone, PartialEq)]
pub enum RateLimiterConfig {
    /// Use a fixed delay between requests
    Delay(Duration),
    /// Use token bucket algorithm with requests per second
    TokenBucket { requests_per_second: f64 },
    /// No rate limiting
    None,
}

impl RateLimiterConfig {
    pub(crate) fn build(&self) -> std::sync::Arc<dyn RateLimiter> {
        match self {
            RateLimiterConfig::Delay(delay) => std::sync::Arc::new(DelayLimiter::new(*delay)),
            RateLimiterConfig::TokenBucket {
                requests_per_second,
            } => std::sync::Arc::new(TokenBucketLimiter::new(*requests_per_second)),
            RateLimiterConfig::None => std::sync::Arc::new(DelayLimiter::new(Duration::ZERO)),
        }
    }
}
