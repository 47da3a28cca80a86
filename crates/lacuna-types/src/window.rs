//! Time windows and cached coverage.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};

use crate::WindowError;

/// A half-open window `[start, end)` of UTC instants.
///
/// Every window entering the cache is expressed in UTC; there is no way to
/// construct one from a naive or local timestamp without converting first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Start instant (inclusive).
    pub start: DateTime<Utc>,
    /// End instant (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window, validating that start <= end.
    ///
    /// A window with `start == end` is valid and empty; requesting it
    /// from the cache fetches nothing and returns no records.
    ///
    /// # Errors
    ///
    /// Returns an error if start > end.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a window covering the given calendar dates (inclusive),
    /// normalized to UTC midnights.
    ///
    /// `from_dates(d, d)` covers the whole of day `d`.
    ///
    /// # Errors
    ///
    /// Returns an error if `start_date` is after `end_date`.
    pub fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, WindowError> {
        let start = Utc.from_utc_datetime(&start_date.and_time(NaiveTime::MIN));
        let end = Utc.from_utc_datetime(&end_date.and_time(NaiveTime::MIN)) + TimeDelta::days(1);
        Self::new(start, end)
    }

    /// Creates a window for the trailing `days` days, ending now.
    #[must_use]
    pub fn trailing_days(days: u32) -> Self {
        let end = Utc::now();
        Self {
            start: end - TimeDelta::days(i64::from(days)),
            end,
        }
    }

    /// Returns true if the window contains the given instant.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Returns true if the window contains no instants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the length of the window.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The contiguous `[earliest, latest]` span of timestamps cached for a
/// series.
///
/// Derived from the stored records, never persisted. Both bounds are
/// inclusive: they are actual record timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageWindow {
    /// Timestamp of the earliest cached record.
    pub earliest: DateTime<Utc>,
    /// Timestamp of the latest cached record.
    pub latest: DateTime<Utc>,
}

impl CoverageWindow {
    /// Creates a coverage window.
    ///
    /// Callers must pass `earliest <= latest`; coverage is derived from a
    /// sorted record sequence, so an inverted span is a bug upstream.
    #[must_use]
    pub fn new(earliest: DateTime<Utc>, latest: DateTime<Utc>) -> Self {
        debug_assert!(earliest <= latest, "inverted coverage window");
        Self { earliest, latest }
    }

    /// Returns true if the instant lies within the covered span.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.earliest && instant <= self.latest
    }
}

impl std::fmt::Display for CoverageWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.earliest, self.latest)
    }
}
