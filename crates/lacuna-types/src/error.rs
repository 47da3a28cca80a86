//! Error types for lacuna core types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error for invalid time windows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Start instant is after the end instant.
    #[error("Invalid time window: {start} > {end}")]
    Inverted {
        /// The start instant.
        start: DateTime<Utc>,
        /// The end instant.
        end: DateTime<Utc>,
    },
}
