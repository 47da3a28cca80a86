//! Display metrics over a returned record slice.

use lacuna_types::Record;

/// Headline metrics for a slice of records, as presentation code
/// typically renders next to a chart: how many points, the largest
/// observed value, and the most recent one.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSummary {
    /// Number of records in the slice.
    pub count: usize,
    /// Largest value in the slice, ignoring NaN. `None` when the slice
    /// is empty or all-NaN.
    pub max_value: Option<f64>,
    /// Value of the most recent record. `None` when the slice is empty.
    pub latest_value: Option<f64>,
}

impl RangeSummary {
    /// Computes the summary of a slice sorted ascending by timestamp.
    #[must_use]
    pub fn from_records(records: &[Record]) -> Self {
        let max_value = records
            .iter()
            .map(|r| r.value)
            .filter(|v| !v.is_nan())
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |m| m.max(v)))
            });

        Self {
            count: records.len(),
            max_value,
            latest_value: records.last().map(|r| r.value),
        }
    }
}
