//! Retry and fallback policies.
//!
//! [`RetryPolicy`] re-issues an operation after transient failures with
//! exponential backoff. [`FallbackPolicy`] turns any failure into a
//! caller-supplied default, for display paths that must not abort.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::config::RetryConfig;
use crate::Result;

/// Exponential backoff over retryable errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Factor applied to the delay after each retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Build a policy from configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            multiplier: config.multiplier,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(0.0).powi(retry as i32);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Run `op`, retrying network and rate-limit failures.
    ///
    /// Any other error propagates immediately. When retries are exhausted
    /// the last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry < self.max_retries => {
                    let delay = self.delay_for(retry);
                    retry += 1;
                    warn!(
                        "{} failed: {}; retrying in {:.1}s ({}/{})",
                        label,
                        e,
                        delay.as_secs_f64(),
                        retry,
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!("{} failed after {} retries: {}", label, retry, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Swallows failures and substitutes a default.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPolicy;

impl FallbackPolicy {
    /// Run `op`; on any error log it and return `default`.
    pub async fn run<T, Fut>(&self, label: &str, default: T, op: Fut) -> T
    where
        Fut: Future<Output = Result<T>>,
    {
        match op.await {
            Ok(value) => value,
            Err(e) => {
                error!("{}: {}", label, e);
                default
            }
        }
    }

    /// Like [`FallbackPolicy::run`] with `T::default()`.
    pub async fn run_or_default<T, Fut>(&self, label: &str, op: Fut) -> T
    where
        T: Default,
        Fut: Future<Output = Result<T>>,
    {
        self.run(label, T::default(), op).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::S1Error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let times = Mutex::new(Vec::new());

        let result = policy
            .run("fetch", || {
                times.lock().unwrap().push(Instant::now());
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(S1Error::Network("connection reset".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let times = times.lock().unwrap();
        let first_gap = times[1] - times[0];
        let second_gap = times[2] - times[1];
        assert!(first_gap >= Duration::from_secs(1) && first_gap < Duration::from_millis(1100));
        assert!(second_gap >= Duration::from_secs(2) && second_gap < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_returns_last_error() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run("fetch", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(S1Error::RateLimit(format!("attempt {n}"))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(S1Error::RateLimit(msg)) => assert_eq!(msg, "attempt 3"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_propagates_immediately() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = policy
            .run("login", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(S1Error::Authentication("bad password".into())) }
            })
            .await;

        assert!(matches!(result, Err(S1Error::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(Instant::now() - start, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = RetryPolicy::none()
            .run("fetch", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(S1Error::Network("down".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_returns_default() {
        let fallback = FallbackPolicy;
        let value = fallback
            .run("boards", vec!["cached".to_string()], async {
                Err::<Vec<String>, _>(S1Error::Parse("layout changed".into()))
            })
            .await;
        assert_eq!(value, vec!["cached".to_string()]);

        let empty: Vec<u32> = fallback
            .run_or_default("topics", async { Err(S1Error::Network("down".into())) })
            .await;
        assert!(empty.is_empty());

        let ok = fallback.run("n", 0, async { Ok(7) }).await;
        assert_eq!(ok, 7);
    }
}
