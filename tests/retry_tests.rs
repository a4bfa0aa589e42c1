use listing_harvest::{FetchError, Fetcher, RetryPolicy, fetch_with_retry};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Fails with `status` until `failures` attempts have been made
struct FlakyFetcher {
    failures: u32,
    status: u16,
    calls: AtomicU32,
}

impl FlakyFetcher {
    fn new(failures: u32, status: u16) -> Self {
        Self {
            failures,
            status,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for FlakyFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            Err(FetchError::Status {
                url: url.to_string(),
                status: self.status,
            })
        } else {
            Ok("<html></html>".to_string())
        }
    }
}

fn quick_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(5)).unwrap()
}

#[cfg(test)]
mod retry_tests {
    use super::*;

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let fetcher = FlakyFetcher::new(2, 503);

        let body = fetch_with_retry(&fetcher, "https://example.com/a", &quick_policy(3))
            .await
            .unwrap();

        assert_eq!(body, "<html></html>");
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_too_many_requests_is_retryable() {
        let fetcher = FlakyFetcher::new(1, 429);
        assert!(fetch_with_retry(&fetcher, "https://example.com/a", &quick_policy(2))
            .await
            .is_ok());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let fetcher = FlakyFetcher::new(10, 404);

        let err = fetch_with_retry(&fetcher, "https://example.com/gone", &quick_policy(5))
            .await
            .unwrap_err();

        assert_eq!(fetcher.calls(), 1);
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(err.url(), "https://example.com/gone");
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let fetcher = FlakyFetcher::new(10, 500);

        let err = fetch_with_retry(&fetcher, "https://example.com/down", &quick_policy(3))
            .await
            .unwrap_err();

        assert_eq!(fetcher.calls(), 3);
        match &err {
            FetchError::Exhausted { url, attempts, source } => {
                assert_eq!(url, "https://example.com/down");
                assert_eq!(*attempts, 3);
                assert!(matches!(**source, FetchError::Status { status: 500, .. }));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let fetcher = FlakyFetcher::new(1, 503);
        let err = fetch_with_retry(&fetcher, "https://example.com/a", &quick_policy(1))
            .await
            .unwrap_err();

        assert_eq!(fetcher.calls(), 1);
        assert!(matches!(err, FetchError::Exhausted { attempts: 1, .. }));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy =
            RetryPolicy::new(10, Duration::from_millis(100), Duration::from_secs(1)).unwrap();

        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(800));
        assert_eq!(policy.backoff(5), Duration::from_secs(1));
        assert_eq!(policy.backoff(30), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(RetryPolicy::new(0, Duration::from_millis(1), Duration::from_millis(1)).is_err());
    }
}
