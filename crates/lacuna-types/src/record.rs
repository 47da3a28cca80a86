//! Timestamped observation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SeriesKey;

/// A single timestamped observation belonging to a series.
///
/// The value's semantics (price, magnitude, concentration) are opaque to
/// the cache. Within a persisted series, `(series, timestamp)` pairs are
/// unique; merging keeps the most recently fetched value for a duplicate
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The series this observation belongs to.
    pub series: SeriesKey,
    /// Timestamp of the observation (UTC).
    pub timestamp: DateTime<Utc>,
    /// The observed quantity.
    pub value: f64,
}

impl Record {
    /// Creates a new record.
    pub fn new(series: impl Into<SeriesKey>, timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            series: series.into(),
            timestamp,
            value,
        }
    }
}
