//! The fetch capability trait and its error types.

use std::time::Duration;

use async_trait::async_trait;
use lacuna_types::{Record, SeriesKey, TimeWindow};
use thiserror::Error;

/// Errors that can occur while fetching records from an upstream source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The upstream call failed.
    #[error("Upstream error for {series} over {window}: {message}")]
    Upstream {
        /// The series being fetched.
        series: SeriesKey,
        /// The window being fetched.
        window: TimeWindow,
        /// Description of the upstream failure.
        message: String,
    },

    /// The fetch exceeded the caller-supplied time budget.
    #[error("Fetch for {series} over {window} timed out after {timeout:?}")]
    Timeout {
        /// The series being fetched.
        series: SeriesKey,
        /// The window being fetched.
        window: TimeWindow,
        /// The time budget that was exceeded.
        timeout: Duration,
    },
}

impl FetchError {
    /// Creates an upstream error.
    pub fn upstream(series: SeriesKey, window: TimeWindow, message: impl Into<String>) -> Self {
        Self::Upstream {
            series,
            window,
            message: message.into(),
        }
    }
}

/// A fetch failure downgraded to a response warning.
///
/// A failed gap fetch does not abort the whole request; it is attached to
/// the response so the caller can surface it next to whatever data was
/// available.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchWarning {
    /// The series whose fetch failed.
    pub series: SeriesKey,
    /// The window that could not be fetched.
    pub window: TimeWindow,
    /// Description of the failure.
    pub message: String,
}

impl From<FetchError> for FetchWarning {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Upstream {
                series,
                window,
                message,
            } => Self {
                series,
                window,
                message,
            },
            FetchError::Timeout {
                series,
                window,
                timeout,
            } => Self {
                series,
                window,
                message: format!("timed out after {timeout:?}"),
            },
        }
    }
}

impl std::fmt::Display for FetchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fetch for {} over {} failed: {}",
            self.series, self.window, self.message
        )
    }
}

/// Capability for retrieving records from an upstream data source.
///
/// Implementations are transport-agnostic (HTTP, file, mock). The cache
/// engine relies on this contract:
///
/// - Results should lie within `window`; the engine re-filters rather than
///   trusting this strictly.
/// - An empty result is valid and distinct from a failure.
/// - A failure for one window never corrupts cache state; the engine
///   merges whatever other windows succeeded.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the records for `series` within the half-open `window`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the upstream call fails.
    async fn fetch(
        &self,
        series: &SeriesKey,
        window: TimeWindow,
    ) -> Result<Vec<Record>, FetchError>;
}
