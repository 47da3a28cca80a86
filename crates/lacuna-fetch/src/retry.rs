//! Backoff-and-retry decorator for fetchers.

use std::time::Duration;

use async_trait::async_trait;
use lacuna_types::{Record, SeriesKey, TimeWindow};
use tracing::warn;

use crate::{FetchError, Fetcher};

/// Retry policy for upstream fetches.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts for a failed fetch.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// Decorator that retries upstream failures with exponential backoff.
///
/// Wraps any [`Fetcher`] implementation. Upstream errors are retried up to
/// the configured number of attempts; timeouts are not retried, since the
/// caller's time budget is already exhausted.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    config: RetryConfig,
}

impl<F> RetryingFetcher<F> {
    /// Wraps a fetcher with the given retry policy.
    #[must_use]
    pub const fn new(inner: F, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Wraps a fetcher with the default retry policy.
    #[must_use]
    pub fn with_defaults(inner: F) -> Self {
        Self::new(inner, RetryConfig::default())
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Calculates the backoff delay with exponential backoff and jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        // Exponential backoff: base_delay * 2^attempt
        let exp_delay = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(10));

        // Cap at max delay
        let capped_delay = exp_delay.min(self.config.max_delay_ms);

        // Deterministic jitter (±25%) derived from the attempt number,
        // avoiding a random number generator dependency
        let jitter_range = capped_delay / 4;
        let jitter = if jitter_range > 0 {
            let jitter_offset = (u64::from(attempt) * 17) % (jitter_range * 2);
            jitter_offset.saturating_sub(jitter_range)
        } else {
            0
        };

        let final_delay = (capped_delay as i64 + jitter as i64).max(1) as u64;
        Duration::from_millis(final_delay)
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RetryingFetcher<F> {
    async fn fetch(
        &self,
        series: &SeriesKey,
        window: TimeWindow,
    ) -> Result<Vec<Record>, FetchError> {
        let mut attempts = 0;

        loop {
            match self.inner.fetch(series, window).await {
                Ok(records) => return Ok(records),
                Err(e @ FetchError::Timeout { .. }) => return Err(e),
                Err(e) if attempts < self.config.max_retries => {
                    attempts += 1;
                    let delay = self.backoff_delay(attempts);
                    warn!(
                        %series,
                        %window,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
