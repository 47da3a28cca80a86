//! Cached-coverage and missing-range computation.
//!
//! Pure functions with no side effects. Coverage is the contiguous
//! `[earliest, latest]` span of a series' cached records; a missing range
//! is a sub-interval of a requested window not yet covered.

use lacuna_types::{CoverageWindow, Record, TimeWindow};

/// Computes the coverage window of a series' cached records.
///
/// Returns `None` for a series with no cached records. The slice must be
/// sorted ascending by timestamp (the store invariant).
#[must_use]
pub fn coverage(records: &[Record]) -> Option<CoverageWindow> {
    debug_assert!(
        records.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
        "coverage computed over an unsorted record slice"
    );

    let first = records.first()?;
    let last = records.last()?;
    Some(CoverageWindow::new(first.timestamp, last.timestamp))
}

/// Computes the sub-ranges of `window` that must be fetched to satisfy it.
///
/// With no coverage the whole window is missing. Otherwise a "before" gap
/// runs from the window start to the earliest cached timestamp, and an
/// "after" gap from the latest cached timestamp to the window end. Gaps
/// use the existing boundary as the fetch edge: the boundary record may be
/// refetched and deduplicated, which is cheaper than ever missing data at
/// the seam. Fetching up to the boundary also keeps coverage contiguous
/// when the requested window lies strictly outside it.
#[must_use]
pub fn missing_ranges(coverage: Option<CoverageWindow>, window: TimeWindow) -> Vec<TimeWindow> {
    if window.is_empty() {
        return Vec::new();
    }

    let Some(covered) = coverage else {
        return vec![window];
    };

    let mut gaps = Vec::new();
    if window.start < covered.earliest {
        gaps.push(TimeWindow {
            start: window.start,
            end: covered.earliest,
        });
    }
    if window.end > covered.latest {
        gaps.push(TimeWindow {
            start: covered.latest,
            end: window.end,
        });
    }
    gaps
}
