//! Request spacing for outbound HTTP calls.
//!
//! Only the time of the most recent request is tracked. When the next
//! request comes sooner than `min_delay` after it, the caller sleeps for a
//! random duration between `min_delay` and `max_delay`.

use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::debug;

use crate::config::ClientConfig;

/// Configuration for request spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpacingConfig {
    /// Requests closer together than this are delayed.
    pub min_delay: Duration,
    /// Upper bound of the random delay.
    pub max_delay: Duration,
}

impl SpacingConfig {
    /// Create a new spacing configuration.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    /// Spacing configuration from the client section of the config file.
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(2000))
    }
}

/// Delays a request when it follows the previous one too closely.
#[derive(Debug)]
pub struct RequestSpacer {
    config: SpacingConfig,
    last_request: Mutex<Option<Instant>>,
}

impl RequestSpacer {
    /// Create a new spacer with the given configuration.
    pub fn new(config: SpacingConfig) -> Self {
        Self {
            config,
            last_request: Mutex::new(None),
        }
    }

    /// The spacing configuration.
    pub fn config(&self) -> SpacingConfig {
        self.config
    }

    /// Delay needed before a request issued at `now`, if any.
    ///
    /// The delay is drawn uniformly from `[min_delay, max_delay]`.
    pub fn required_delay(&self, now: Instant) -> Option<Duration> {
        let last = *self.last_request.lock().unwrap_or_else(|e| e.into_inner());
        let last = last?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed >= self.config.min_delay {
            return None;
        }
        let min = self.config.min_delay.as_millis() as u64;
        let max = self.config.max_delay.as_millis() as u64;
        let millis = rand::rng().random_range(min..=max);
        Some(Duration::from_millis(millis))
    }

    /// Wait if needed, then record the request time.
    pub async fn wait(&self) {
        if let Some(delay) = self.required_delay(Instant::now()) {
            debug!("Spacing request, sleeping {:?}", delay);
            tokio::time::sleep(delay).await;
        }
        self.mark();
    }

    /// Record that a request was issued now.
    pub fn mark(&self) {
        let mut last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some(Instant::now());
    }

    /// Time of the most recent request.
    pub fn last_request(&self) -> Option<Instant> {
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RequestSpacer {
    fn default() -> Self {
        Self::new(SpacingConfig::default())
    }
}
