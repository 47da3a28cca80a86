//! Durable record storage for the lacuna incremental time-series cache.
//!
//! This crate provides the persistence layer:
//!
//! - [`CacheStore`] - In-memory map from series key to sorted records
//! - [`FileStore`] - File-backed load/save/clear with atomic replace
//! - [`StoreError`] - Typed persistence failures

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/lacuna/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod file;

pub use cache::CacheStore;
pub use file::{FileStore, StoreError};
