//! Cache coordination: gap fetch, merge, conditional persist, slice.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use lacuna_fetch::{FetchError, FetchWarning, Fetcher};
use lacuna_store::{CacheStore, FileStore, StoreError};
use lacuna_types::{Record, SeriesKey, TimeWindow};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coverage;

/// Errors that abort a range request.
///
/// Recoverable conditions (a failed gap fetch, an unreadable store, a
/// failed save) do not appear here; they are downgraded to
/// [`ResponseWarning`]s so the caller still sees whatever data is
/// available.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No cached data exists for the series and every gap fetch failed.
    #[error("No data available for {series} in requested range")]
    NoDataAvailable {
        /// The series that had no data.
        series: SeriesKey,
    },

    /// The store failed in a way that cannot be recovered by treating it
    /// as empty (e.g., an unreadable file that does exist).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A recoverable problem encountered while serving a range request.
#[derive(Debug, Clone)]
pub enum ResponseWarning {
    /// A gap fetch failed; data from other gaps and the cache is still
    /// returned.
    Fetch(FetchWarning),
    /// The persisted store was unreadable and treated as empty.
    CorruptStore {
        /// Description of the decode failure.
        message: String,
    },
    /// Persisting the merged store failed; the returned records are
    /// correct but in-memory only until a later request saves them.
    SaveFailed {
        /// Description of the persistence failure.
        message: String,
    },
}

impl std::fmt::Display for ResponseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(warning) => write!(f, "{warning}"),
            Self::CorruptStore { message } => {
                write!(f, "cache was unreadable and has been reset: {message}")
            }
            Self::SaveFailed { message } => {
                write!(f, "fetched data could not be persisted: {message}")
            }
        }
    }
}

/// The outcome of a range request: the requested slice plus any
/// recoverable warnings collected along the way.
#[derive(Debug, Clone)]
pub struct RangeResponse {
    /// Records with timestamps in the requested window, ascending.
    pub records: Vec<Record>,
    /// Recoverable problems encountered while serving the request.
    pub warnings: Vec<ResponseWarning>,
}

impl RangeResponse {
    /// Returns the number of records in the response.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the response contains no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Computes display metrics over the returned slice.
    #[must_use]
    pub fn summary(&self) -> crate::RangeSummary {
        crate::RangeSummary::from_records(&self.records)
    }
}

/// Configuration for the cache coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Time budget for each gap fetch. A fetch exceeding it is treated
    /// as failed; `None` means no bound.
    pub fetch_timeout: Option<Duration>,
    /// Maximum gap fetches in flight at once.
    pub fetch_concurrency: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: None,
            fetch_concurrency: 4,
        }
    }
}

/// Orchestrates the incremental range cache.
///
/// For each requested window the coordinator computes the missing
/// sub-ranges, fetches only those from the upstream [`Fetcher`], merges
/// the results into the store with last-write-wins deduplication,
/// persists only when content changed, and returns the requested slice.
///
/// The whole load-fetch-merge-save sequence runs under the store's lock,
/// so concurrent requests through clones of the same [`FileStore`] handle
/// cannot lose each other's writes.
#[derive(Debug)]
pub struct CacheCoordinator<F> {
    store: FileStore,
    fetcher: F,
    config: CoordinatorConfig,
}

impl<F: Fetcher> CacheCoordinator<F> {
    /// Creates a coordinator with the default configuration.
    #[must_use]
    pub fn new(store: FileStore, fetcher: F) -> Self {
        Self::with_config(store, fetcher, CoordinatorConfig::default())
    }

    /// Creates a coordinator with the given configuration.
    #[must_use]
    pub const fn with_config(store: FileStore, fetcher: F, config: CoordinatorConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Returns the store handle.
    #[must_use]
    pub const fn store(&self) -> &FileStore {
        &self.store
    }

    /// Returns the upstream fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Returns when the persisted cache was last written, if ever.
    #[must_use]
    pub fn last_updated(&self) -> Option<SystemTime> {
        self.store.last_modified()
    }

    /// Returns the cached records for `series` within `window`, fetching
    /// any missing sub-ranges first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoDataAvailable`] if the series has no
    /// cached data and every gap fetch failed, or a store error if the
    /// persisted state cannot be read at all.
    pub async fn get_range(
        &self,
        series: &SeriesKey,
        window: TimeWindow,
    ) -> Result<RangeResponse, EngineError> {
        self.get_range_filtered(series, window, |_| true).await
    }

    /// Like [`get_range`](Self::get_range), with an extra caller-supplied
    /// display filter (e.g., a minimum-value threshold) applied to the
    /// returned slice.
    ///
    /// The filter restricts only the response; unfiltered records are
    /// still merged and persisted.
    ///
    /// # Errors
    ///
    /// See [`get_range`](Self::get_range).
    pub async fn get_range_filtered(
        &self,
        series: &SeriesKey,
        window: TimeWindow,
        filter: impl Fn(&Record) -> bool,
    ) -> Result<RangeResponse, EngineError> {
        let _guard = self.store.lock().lock().await;
        let mut warnings = Vec::new();

        let mut cache = match self.store.load() {
            Ok(cache) => cache,
            Err(error @ StoreError::Corrupt { .. }) => {
                warn!(%error, "treating unreadable store as empty");
                warnings.push(ResponseWarning::CorruptStore {
                    message: error.to_string(),
                });
                CacheStore::new()
            }
            Err(error) => return Err(error.into()),
        };

        let existing = cache.series(series).to_vec();
        let gaps = coverage::missing_ranges(coverage::coverage(&existing), window);
        debug!(%series, %window, gaps = gaps.len(), cached = existing.len(), "computed missing ranges");

        let (batches, failures) = self.fetch_gaps(series, &gaps).await;
        let every_fetch_failed = !gaps.is_empty() && failures.len() == gaps.len();
        warnings.extend(failures.into_iter().map(ResponseWarning::Fetch));

        if every_fetch_failed && existing.is_empty() {
            return Err(EngineError::NoDataAvailable {
                series: series.clone(),
            });
        }

        let merged = merge_records(series, &existing, batches);
        if merged == existing {
            debug!(%series, "merge changed nothing, skipping persist");
        } else {
            info!(
                %series,
                records = merged.len(),
                added = merged.len().saturating_sub(existing.len()),
                "merged fetched records"
            );
            cache.replace_series(series.clone(), merged.clone());
            if let Err(error) = self.store.save(&cache) {
                warn!(%error, "failed to persist merged store");
                warnings.push(ResponseWarning::SaveFailed {
                    message: error.to_string(),
                });
            }
        }

        let records = merged
            .into_iter()
            .filter(|r| window.contains(r.timestamp) && filter(r))
            .collect();

        Ok(RangeResponse { records, warnings })
    }

    /// Deletes all persisted cache state.
    ///
    /// The next request for any series refetches its whole window.
    /// Idempotent: clearing an absent store succeeds.
    ///
    /// # Errors
    ///
    /// Returns a store error if an existing file cannot be deleted.
    pub async fn force_refresh(&self) -> Result<(), EngineError> {
        let _guard = self.store.lock().lock().await;
        info!(path = %self.store.path().display(), "force refresh, clearing store");
        self.store.clear()?;
        Ok(())
    }

    /// Fetches all gaps concurrently, pairing each result with its gap.
    ///
    /// Failures never abort the request; they are collected so data from
    /// successful gaps still merges.
    async fn fetch_gaps(
        &self,
        series: &SeriesKey,
        gaps: &[TimeWindow],
    ) -> (Vec<(TimeWindow, Vec<Record>)>, Vec<FetchWarning>) {
        let results: Vec<(TimeWindow, Result<Vec<Record>, FetchError>)> =
            stream::iter(gaps.iter().copied().map(|gap| {
                let fetch = self.fetch_one(series, gap);
                async move { (gap, fetch.await) }
            }))
            .buffer_unordered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        let mut batches = Vec::new();
        let mut failures = Vec::new();
        for (gap, result) in results {
            match result {
                Ok(records) => {
                    debug!(%series, window = %gap, records = records.len(), "fetched gap");
                    batches.push((gap, records));
                }
                Err(error) => {
                    warn!(%series, window = %gap, %error, "gap fetch failed");
                    failures.push(FetchWarning::from(error));
                }
            }
        }
        (batches, failures)
    }

    /// Runs a single gap fetch under the configured time budget.
    async fn fetch_one(
        &self,
        series: &SeriesKey,
        gap: TimeWindow,
    ) -> Result<Vec<Record>, FetchError> {
        match self.config.fetch_timeout {
            Some(budget) => {
                match tokio::time::timeout(budget, self.fetcher.fetch(series, gap)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout {
                        series: series.clone(),
                        window: gap,
                        timeout: budget,
                    }),
                }
            }
            None => self.fetcher.fetch(series, gap).await,
        }
    }
}

/// Merges fetched batches into an existing record sequence.
///
/// Records are keyed by timestamp; fetched batches are applied after the
/// existing records and in completion order, so the most recently fetched
/// value wins a duplicate timestamp. Each batch is re-filtered to its own
/// gap and to the requested series rather than trusting the upstream to
/// honor the fetch contract. The result is strictly sorted with no
/// duplicate timestamps.
///
/// Merging is idempotent: replaying the same batches yields the same
/// sequence.
fn merge_records(
    series: &SeriesKey,
    existing: &[Record],
    batches: Vec<(TimeWindow, Vec<Record>)>,
) -> Vec<Record> {
    let mut by_timestamp: BTreeMap<DateTime<Utc>, Record> = existing
        .iter()
        .map(|r| (r.timestamp, r.clone()))
        .collect();

    for (gap, records) in batches {
        for record in records {
            if record.series == *series && gap.contains(record.timestamp) {
                by_timestamp.insert(record.timestamp, record);
            }
        }
    }

    by_timestamp.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    fn win(start: u32, end: u32) -> TimeWindow {
        TimeWindow::new(day(start), day(end)).unwrap()
    }

    fn rec(series: &str, d: u32, value: f64) -> Record {
        Record::new(series, day(d), value)
    }

    /// Serves records from a mutable "upstream truth", records every
    /// requested window, and fails on request for configured windows.
    struct MockFetcher {
        truth: StdMutex<Vec<Record>>,
        fail_windows: Vec<TimeWindow>,
        calls: StdMutex<Vec<TimeWindow>>,
    }

    impl MockFetcher {
        fn new(truth: Vec<Record>) -> Self {
            Self {
                truth: StdMutex::new(truth),
                fail_windows: Vec::new(),
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, window: TimeWindow) -> Self {
            self.fail_windows.push(window);
            self
        }

        fn set_truth(&self, records: Vec<Record>) {
            *self.truth.lock().unwrap() = records;
        }

        fn calls(&self) -> Vec<TimeWindow> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for MockFetcher {
        async fn fetch(
            &self,
            series: &SeriesKey,
            window: TimeWindow,
        ) -> Result<Vec<Record>, FetchError> {
            self.calls.lock().unwrap().push(window);
            if self.fail_windows.contains(&window) {
                return Err(FetchError::upstream(series.clone(), window, "mock failure"));
            }
            Ok(self
                .truth
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.series == *series && window.contains(r.timestamp))
                .cloned()
                .collect())
        }
    }

    fn coordinator(
        temp_dir: &TempDir,
        fetcher: MockFetcher,
    ) -> CacheCoordinator<MockFetcher> {
        CacheCoordinator::new(
            FileStore::open(temp_dir.path().join("cache.json")),
            fetcher,
        )
    }

    fn timestamps(records: &[Record]) -> Vec<DateTime<Utc>> {
        records.iter().map(|r| r.timestamp).collect()
    }

    #[tokio::test]
    async fn test_cold_cache_fetches_the_whole_window() {
        let temp_dir = TempDir::new().unwrap();
        let truth = (1..=4).map(|d| rec("X", d, f64::from(d))).collect();
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let series = SeriesKey::from("X");

        let response = coord.get_range(&series, win(1, 5)).await.unwrap();

        assert_eq!(timestamps(&response.records), vec![day(1), day(2), day(3), day(4)]);
        assert!(response.warnings.is_empty());
        assert_eq!(coord.fetcher().calls(), vec![win(1, 5)]);

        let persisted = coord.store().load().unwrap();
        assert_eq!(persisted.series(&series).len(), 4);
    }

    #[tokio::test]
    async fn test_extension_fetches_only_the_missing_gap() {
        let temp_dir = TempDir::new().unwrap();
        let truth = (1..=6).map(|d| rec("X", d, f64::from(d))).collect();
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let series = SeriesKey::from("X");

        coord.get_range(&series, win(1, 5)).await.unwrap();
        let response = coord.get_range(&series, win(3, 7)).await.unwrap();

        // The first fetch returned days 1-4, so coverage is [day 1, day 4]
        // and only [day 4, day 7) is fetched now.
        assert_eq!(
            coord.fetcher().calls(),
            vec![win(1, 5), win(4, 7)]
        );
        assert_eq!(
            timestamps(&response.records),
            vec![day(3), day(4), day(5), day(6)]
        );

        // The store now holds the union, still sorted and deduplicated.
        let persisted = coord.store().load().unwrap();
        assert_eq!(
            timestamps(persisted.series(&series)),
            (1..=6).map(day).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_backward_extension_fetches_only_the_earlier_gap() {
        let temp_dir = TempDir::new().unwrap();
        let truth = (1..=5).map(|d| rec("X", d, f64::from(d))).collect();
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let series = SeriesKey::from("X");

        // Coverage becomes [day 3, day 5].
        coord.get_range(&series, win(3, 6)).await.unwrap();

        // Requesting [day 1, day 5) overlaps coverage; only the earlier
        // sub-range up to the cached boundary is fetched.
        let response = coord.get_range(&series, win(1, 5)).await.unwrap();

        assert_eq!(coord.fetcher().calls(), vec![win(3, 6), win(1, 3)]);
        assert_eq!(
            timestamps(&response.records),
            vec![day(1), day(2), day(3), day(4)]
        );
    }

    #[tokio::test]
    async fn test_window_inside_coverage_fetches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let truth = (1..=4).map(|d| rec("X", d, f64::from(d))).collect();
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let series = SeriesKey::from("X");

        coord.get_range(&series, win(1, 5)).await.unwrap();
        let response = coord.get_range(&series, win(2, 4)).await.unwrap();

        assert_eq!(coord.fetcher().calls().len(), 1);
        assert_eq!(timestamps(&response.records), vec![day(2), day(3)]);
    }

    #[tokio::test]
    async fn test_identical_covered_calls_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let truth = (1..=4).map(|d| rec("X", d, f64::from(d))).collect();
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let series = SeriesKey::from("X");

        coord.get_range(&series, win(1, 5)).await.unwrap();

        let first = coord.get_range(&series, win(2, 4)).await.unwrap();
        let modified_after_first = coord.store().last_modified().unwrap();
        let bytes_after_first = std::fs::read(coord.store().path()).unwrap();

        let second = coord.get_range(&series, win(2, 4)).await.unwrap();
        let modified_after_second = coord.store().last_modified().unwrap();
        let bytes_after_second = std::fs::read(coord.store().path()).unwrap();

        assert_eq!(first.records, second.records);
        // No second save: neither content nor mtime moved.
        assert_eq!(bytes_after_first, bytes_after_second);
        assert_eq!(modified_after_first, modified_after_second);
    }

    #[tokio::test]
    async fn test_partial_failure_returns_available_data_with_warnings() {
        let temp_dir = TempDir::new().unwrap();
        let truth = (1..=5).map(|d| rec("X", d, f64::from(d))).collect();
        let fetcher = MockFetcher::new(truth).failing_on(win(1, 3));
        let coord = coordinator(&temp_dir, fetcher);
        let series = SeriesKey::from("X");

        // Prefill coverage [day 3, day 4].
        coord.get_range(&series, win(3, 5)).await.unwrap();

        // [day 1, day 3) fails, [day 4, day 6) succeeds.
        let response = coord.get_range(&series, win(1, 6)).await.unwrap();

        assert_eq!(
            timestamps(&response.records),
            vec![day(3), day(4), day(5)]
        );
        assert_eq!(response.warnings.len(), 1);
        assert!(matches!(
            &response.warnings[0],
            ResponseWarning::Fetch(w) if w.window == win(1, 3)
        ));
    }

    #[tokio::test]
    async fn test_no_cache_and_all_fetches_failed_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new(Vec::new()).failing_on(win(1, 5));
        let coord = coordinator(&temp_dir, fetcher);

        let result = coord.get_range(&SeriesKey::from("X"), win(1, 5)).await;
        assert!(matches!(
            result,
            Err(EngineError::NoDataAvailable { series }) if series.as_str() == "X"
        ));
    }

    #[tokio::test]
    async fn test_cached_data_survives_total_fetch_failure() {
        let temp_dir = TempDir::new().unwrap();
        let truth = (2..=4).map(|d| rec("X", d, f64::from(d))).collect();
        let fetcher = MockFetcher::new(truth).failing_on(win(4, 6));
        let coord = coordinator(&temp_dir, fetcher);
        let series = SeriesKey::from("X");

        coord.get_range(&series, win(2, 5)).await.unwrap();
        let response = coord.get_range(&series, win(2, 6)).await.unwrap();

        assert_eq!(
            timestamps(&response.records),
            vec![day(2), day(3), day(4)]
        );
        assert_eq!(response.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_merging_one_series_leaves_others_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let truth = vec![
            rec("A", 1, 1.0),
            rec("A", 2, 2.0),
            rec("B", 1, 10.0),
            rec("B", 2, 20.0),
        ];
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let a = SeriesKey::from("A");
        let b = SeriesKey::from("B");

        coord.get_range(&b, win(1, 3)).await.unwrap();
        let b_before = serde_json::to_string(coord.store().load().unwrap().series(&b)).unwrap();

        coord.get_range(&a, win(1, 3)).await.unwrap();
        let b_after = serde_json::to_string(coord.store().load().unwrap().series(&b)).unwrap();

        assert_eq!(b_before, b_after);
    }

    #[tokio::test]
    async fn test_corrupt_store_is_recovered_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, "definitely not json").unwrap();

        let truth = (1..=2).map(|d| rec("X", d, f64::from(d))).collect();
        let coord = CacheCoordinator::new(FileStore::open(path), MockFetcher::new(truth));
        let series = SeriesKey::from("X");

        let response = coord.get_range(&series, win(1, 3)).await.unwrap();

        assert_eq!(response.records.len(), 2);
        assert!(matches!(
            &response.warnings[0],
            ResponseWarning::CorruptStore { .. }
        ));

        // The rewritten store decodes cleanly again.
        assert_eq!(coord.store().load().unwrap().series(&series).len(), 2);
    }

    #[tokio::test]
    async fn test_display_filter_restricts_the_response_only() {
        let temp_dir = TempDir::new().unwrap();
        let truth = vec![rec("X", 1, 1.5), rec("X", 2, 4.5), rec("X", 3, 2.0)];
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let series = SeriesKey::from("X");

        let response = coord
            .get_range_filtered(&series, win(1, 4), |r| r.value >= 2.0)
            .await
            .unwrap();

        assert_eq!(timestamps(&response.records), vec![day(2), day(3)]);
        // All three records were still merged and persisted.
        assert_eq!(coord.store().load().unwrap().series(&series).len(), 3);
    }

    #[tokio::test]
    async fn test_empty_window_fetches_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let coord = coordinator(&temp_dir, MockFetcher::new(Vec::new()));

        let response = coord
            .get_range(&SeriesKey::from("X"), win(3, 3))
            .await
            .unwrap();

        assert!(response.is_empty());
        assert!(coord.fetcher().calls().is_empty());
        assert!(!coord.store().exists());
    }

    #[tokio::test]
    async fn test_timed_out_fetch_becomes_a_warning() {
        struct NeverResolves;

        #[async_trait]
        impl Fetcher for NeverResolves {
            async fn fetch(
                &self,
                _series: &SeriesKey,
                _window: TimeWindow,
            ) -> Result<Vec<Record>, FetchError> {
                futures::future::pending().await
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("cache.json"));
        let series = SeriesKey::from("X");

        // Seed the store directly so cached data exists despite the
        // fetcher never answering.
        let mut cache = CacheStore::new();
        cache.replace_series(series.clone(), vec![rec("X", 2, 2.0), rec("X", 3, 3.0)]);
        store.save(&cache).unwrap();

        let coord = CacheCoordinator::with_config(
            store,
            NeverResolves,
            CoordinatorConfig {
                fetch_timeout: Some(Duration::from_millis(50)),
                ..CoordinatorConfig::default()
            },
        );

        let response = coord.get_range(&series, win(2, 5)).await.unwrap();

        assert_eq!(timestamps(&response.records), vec![day(2), day(3)]);
        assert!(matches!(
            &response.warnings[0],
            ResponseWarning::Fetch(w) if w.message.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_refetched_boundary_takes_the_latest_value() {
        let temp_dir = TempDir::new().unwrap();
        let truth: Vec<Record> = (1..=3).map(|d| rec("X", d, 1.0)).collect();
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let series = SeriesKey::from("X");

        coord.get_range(&series, win(1, 4)).await.unwrap();

        // Upstream revises the boundary record and extends the series.
        coord.fetcher().set_truth(vec![
            rec("X", 1, 1.0),
            rec("X", 2, 1.0),
            rec("X", 3, 9.9),
            rec("X", 4, 4.0),
        ]);

        let response = coord.get_range(&series, win(1, 5)).await.unwrap();

        let boundary = response
            .records
            .iter()
            .find(|r| r.timestamp == day(3))
            .unwrap();
        assert!((boundary.value - 9.9).abs() < 1e-10);
        assert_eq!(coord.fetcher().calls(), vec![win(1, 4), win(3, 5)]);
    }

    #[tokio::test]
    async fn test_failed_save_still_returns_merged_data() {
        let temp_dir = TempDir::new().unwrap();
        // Turn the would-be parent directory into a file so the save's
        // directory creation fails while the load still sees no file.
        let blocker = temp_dir.path().join("sub");
        std::fs::write(&blocker, "in the way").unwrap();

        let truth = (1..=2).map(|d| rec("X", d, f64::from(d))).collect();
        let coord = CacheCoordinator::new(
            FileStore::open(blocker.join("cache.json")),
            MockFetcher::new(truth),
        );

        let response = coord
            .get_range(&SeriesKey::from("X"), win(1, 3))
            .await
            .unwrap();

        assert_eq!(response.records.len(), 2);
        assert!(matches!(
            &response.warnings[0],
            ResponseWarning::SaveFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_force_refresh_clears_persisted_state() {
        let temp_dir = TempDir::new().unwrap();
        let truth = (1..=2).map(|d| rec("X", d, f64::from(d))).collect();
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let series = SeriesKey::from("X");

        coord.get_range(&series, win(1, 3)).await.unwrap();
        assert!(coord.store().exists());
        assert!(coord.last_updated().is_some());

        coord.force_refresh().await.unwrap();
        assert!(!coord.store().exists());
        assert!(coord.last_updated().is_none());

        // Idempotent.
        coord.force_refresh().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_requests_do_not_lose_writes() {
        let temp_dir = TempDir::new().unwrap();
        let truth = vec![rec("A", 1, 1.0), rec("B", 1, 10.0)];
        let coord = coordinator(&temp_dir, MockFetcher::new(truth));
        let a = SeriesKey::from("A");
        let b = SeriesKey::from("B");

        let (first, second) =
            tokio::join!(coord.get_range(&a, win(1, 2)), coord.get_range(&b, win(1, 2)));
        first.unwrap();
        second.unwrap();

        let persisted = coord.store().load().unwrap();
        assert_eq!(persisted.series(&a).len(), 1);
        assert_eq!(persisted.series(&b).len(), 1);
    }

    #[test]
    fn test_merge_dedup_keeps_the_later_batch() {
        let series = SeriesKey::from("X");
        let batches = vec![
            (win(1, 3), vec![rec("X", 1, 1.0), rec("X", 2, 2.0)]),
            (win(2, 4), vec![rec("X", 2, 99.0), rec("X", 3, 3.0)]),
        ];

        let merged = merge_records(&series, &[], batches);

        assert_eq!(timestamps(&merged), vec![day(1), day(2), day(3)]);
        assert!((merged[1].value - 99.0).abs() < 1e-10);
    }

    #[test]
    fn test_merge_fetched_records_win_over_existing() {
        let series = SeriesKey::from("X");
        let existing = vec![rec("X", 2, 2.0)];
        let batches = vec![(win(2, 4), vec![rec("X", 2, 5.0)])];

        let merged = merge_records(&series, &existing, batches);

        assert_eq!(merged.len(), 1);
        assert!((merged[0].value - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_merge_drops_records_outside_their_gap() {
        let series = SeriesKey::from("X");
        let batches = vec![(win(2, 4), vec![rec("X", 1, 1.0), rec("X", 2, 2.0)])];

        let merged = merge_records(&series, &[], batches);

        assert_eq!(timestamps(&merged), vec![day(2)]);
    }

    #[test]
    fn test_merge_drops_records_for_other_series() {
        let series = SeriesKey::from("X");
        let batches = vec![(win(1, 4), vec![rec("X", 1, 1.0), rec("Y", 2, 2.0)])];

        let merged = merge_records(&series, &[], batches);

        assert_eq!(timestamps(&merged), vec![day(1)]);
    }

    #[test]
    fn test_merge_sorts_unordered_fetch_results() {
        let series = SeriesKey::from("X");
        let batches = vec![(
            win(1, 5),
            vec![rec("X", 4, 4.0), rec("X", 1, 1.0), rec("X", 3, 3.0)],
        )];

        let merged = merge_records(&series, &[], batches);

        assert_eq!(timestamps(&merged), vec![day(1), day(3), day(4)]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let series = SeriesKey::from("X");
        let existing = vec![rec("X", 1, 1.0), rec("X", 2, 2.0)];
        let batch = vec![(win(2, 4), vec![rec("X", 2, 2.0), rec("X", 3, 3.0)])];

        let once = merge_records(&series, &existing, batch.clone());
        let twice = merge_records(&series, &once, batch);

        assert_eq!(once, twice);
    }
}
