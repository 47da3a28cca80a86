//! Gap computation and cache coordination for the lacuna incremental
//! time-series cache.
//!
//! This crate provides the orchestration layer:
//!
//! - [`coverage`] - Pure computation of cached coverage and missing ranges
//! - [`CacheCoordinator`] - Gap fetch, merge, conditional persist, slice
//! - [`RangeResponse`] - Returned records plus recoverable warnings
//! - [`RangeSummary`] - Display metrics over a returned slice

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/lacuna/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod coordinator;
pub mod coverage;
mod summary;

pub use coordinator::{
    CacheCoordinator, CoordinatorConfig, EngineError, RangeResponse, ResponseWarning,
};
pub use summary::RangeSummary;
