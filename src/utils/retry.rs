//! Retry with exponential backoff
//!
//! Store requests that fail with a connection-level error are retried with a
//! doubling, jittered delay. All other failures return immediately.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Settings;

/// Upper bound on the doubling exponent
const MAX_SHIFT: u32 = 16;

/// How many times, and how patiently, to retry a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each one after that
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Add a random extra of up to one delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::dynamodb()
    }
}

impl RetryConfig {
    /// Short delays suited to single-item DynamoDB calls
    pub fn dynamodb() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            jitter: true,
        }
    }

    /// Make exactly one attempt
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::dynamodb()
        }
    }

    /// DynamoDB delays with the retry budget from `DYNAMODB_MAX_RETRIES`
    pub fn from_settings(settings: &Settings) -> Self {
        Self::dynamodb().with_max_retries(settings.max_retries)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `retry` (0 for the first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = self
            .base_delay
            .saturating_mul(1u32 << retry.min(MAX_SHIFT))
            .min(self.max_delay);

        let millis = delay.as_millis() as u64;
        if self.jitter && millis > 0 {
            delay + Duration::from_millis(rand::thread_rng().gen_range(0..millis))
        } else {
            delay
        }
    }
}

/// Outcome of [`retry_with_backoff`]
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// Result of the last attempt
    pub result: Result<T, E>,
    pub attempts: u32,
    /// Time spent sleeping between attempts
    pub total_delay: Duration,
}

/// Run `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or the retry budget is spent.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    config: &RetryConfig,
    is_retryable: R,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempts = 0;
    let mut total_delay = Duration::ZERO;

    loop {
        let result = operation().await;
        attempts += 1;

        let delay = match &result {
            Err(err) if attempts <= config.max_retries && is_retryable(err) => {
                config.delay_for(attempts - 1)
            }
            _ => {
                return RetryResult {
                    result,
                    attempts,
                    total_delay,
                }
            }
        };

        tracing::debug!(
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "Retrying after transient failure"
        );
        sleep(delay).await;
        total_delay += delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn quick() -> RetryConfig {
        RetryConfig::dynamodb()
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[test]
    fn test_delay_doubles_up_to_max() {
        let config = RetryConfig::dynamodb().with_jitter(false);

        assert_eq!(config.delay_for(0), Duration::from_millis(50));
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(4), Duration::from_millis(800));
        assert_eq!(config.delay_for(5), Duration::from_secs(1));
        assert_eq!(config.delay_for(40), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_within_one_delay() {
        let config = RetryConfig::dynamodb();
        for _ in 0..20 {
            let delay = config.delay_for(0);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay < Duration::from_millis(100));
        }
    }

    #[test]
    fn test_budget_from_settings() {
        let settings = Settings {
            max_retries: 7,
            ..Settings::default()
        };
        assert_eq!(RetryConfig::from_settings(&settings).max_retries, 7);
        assert_eq!(RetryConfig::disabled().max_retries, 0);
    }

    #[tokio::test]
    async fn test_connection_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let outcome = retry_with_backoff(&quick(), StoreError::is_retryable, || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Connection("timed out".to_string()))
                } else {
                    Ok("stored")
                }
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), "stored");
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.total_delay, Duration::from_millis(3));
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let config = quick().with_max_retries(2);

        let outcome = retry_with_backoff(&config, StoreError::is_retryable, || async {
            Err::<(), _>(StoreError::Connection("unreachable".to_string()))
        })
        .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_return_immediately() {
        let outcome = retry_with_backoff(&quick(), StoreError::is_retryable, || async {
            Err::<(), _>(StoreError::not_found("Kenya AA"))
        })
        .await;

        assert!(outcome.result.unwrap_err().is_not_found());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.total_delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_disabled_makes_one_attempt() {
        let outcome = retry_with_backoff(&RetryConfig::disabled(), StoreError::is_retryable, || async {
            Err::<(), _>(StoreError::Connection("reset".to_string()))
        })
        .await;

        assert_eq!(outcome.attempts, 1);
    }
}
