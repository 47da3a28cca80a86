//! Upstream fetch capability for the lacuna incremental time-series cache.
//!
//! This crate provides the integration seam with upstream data sources:
//!
//! - [`Fetcher`] - Capability trait for retrieving records over a window
//! - [`FetchError`] / [`FetchWarning`] - Typed fetch failures
//! - [`RetryingFetcher`] - Backoff-and-retry decorator for any fetcher

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/lacuna/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod fetcher;
mod retry;

pub use fetcher::{FetchError, FetchWarning, Fetcher};
pub use retry::{RetryConfig, RetryingFetcher};
