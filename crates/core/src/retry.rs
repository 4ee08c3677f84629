//! Per-call retry with exponential backoff and jitter
//!
//! Used by transport adapters around each individual storage request. The
//! upload coordinator never retries a part itself; a part that still fails
//! after the transport gave up is reported as failed.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::error::Result;

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// `config.max_attempts` is reached
///
/// `label` names the call in debug logs (e.g. `"upload_part"`).
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                let backoff = backoff_for(config, attempt);
                tracing::debug!(
                    call = label,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "retrying storage call"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Backoff before the next attempt: `initial * 2^(attempt-1)`, capped, plus
/// up to the same amount again in jitter
fn backoff_for(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config
        .initial_backoff_ms
        .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(10));
    let capped = base.min(config.max_backoff_ms);
    let jitter = if capped == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..capped)
    };
    Duration::from_millis(capped + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_backoff_ms: 100,
            max_backoff_ms: 1000,
        };

        let first = backoff_for(&config, 1).as_millis();
        assert!((100..200).contains(&first));

        let third = backoff_for(&config, 3).as_millis();
        assert!((400..800).contains(&third));

        let late = backoff_for(&config, 9).as_millis();
        assert!((1000..2000).contains(&late));
    }

    #[test]
    fn test_zero_backoff() {
        let config = RetryConfig {
            max_attempts: 2,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        };
        assert_eq!(backoff_for(&config, 1), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(&fast(), "test", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Network("Request timeout".to_string()))
                } else {
                    Ok("etag")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "etag");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = retry_with_backoff(&fast(), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Network("503 Service Unavailable".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = retry_with_backoff(&fast(), "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::Network("Service error: AccessDenied".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig {
            max_attempts: 0,
            ..fast()
        };
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let _ = retry_with_backoff(&config, "test", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::Network("timeout".to_string()))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
