//! Core types for the lacuna incremental time-series cache.
//!
//! This crate provides the fundamental data structures used throughout
//! lacuna:
//!
//! - [`Record`] - A single timestamped observation with its series key
//! - [`SeriesKey`] - Identifier for a logical time series
//! - [`TimeWindow`] - Half-open `[start, end)` window of UTC instants
//! - [`CoverageWindow`] - The contiguous span currently cached for a series

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/lacuna/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod record;
mod series;
mod window;

pub use error::WindowError;
pub use record::Record;
pub use series::SeriesKey;
pub use window::{CoverageWindow, TimeWindow};
