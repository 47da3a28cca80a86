//! In-memory representation of the persisted cache.

use std::collections::BTreeMap;

use lacuna_types::{Record, SeriesKey};
use serde::{Deserialize, Serialize};

/// The full set of cached records for all series.
///
/// Maps each series key to its record sequence, kept strictly sorted by
/// ascending timestamp with no duplicate timestamps. A `BTreeMap` keeps
/// the serialized form deterministic, so an unchanged store round-trips to
/// identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStore {
    series: BTreeMap<SeriesKey, Vec<Record>>,
}

impl CacheStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            series: BTreeMap::new(),
        }
    }

    /// Returns the cached records for a series, sorted ascending by
    /// timestamp. Unknown series yield an empty slice.
    #[must_use]
    pub fn series(&self, key: &SeriesKey) -> &[Record] {
        self.series.get(key).map_or(&[], Vec::as_slice)
    }

    /// Replaces the record sequence for a series.
    ///
    /// An empty sequence removes the series entirely. The records must
    /// belong to `key` and be strictly sorted by ascending timestamp;
    /// passing anything else is a bug in the merge step, not a runtime
    /// condition.
    pub fn replace_series(&mut self, key: SeriesKey, records: Vec<Record>) {
        debug_assert!(
            records.iter().all(|r| r.series == key),
            "record series key does not match store entry"
        );
        debug_assert!(
            records.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "series records must be strictly sorted by timestamp"
        );

        if records.is_empty() {
            self.series.remove(&key);
        } else {
            self.series.insert(key, records);
        }
    }

    /// Returns an iterator over the keys of all cached series.
    pub fn series_keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    /// Returns the number of cached series.
    #[must_use]
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Returns the total number of records across all series.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Returns true if no series are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
