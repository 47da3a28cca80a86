//! Incremental gap-filling cache for time-series data.
//!
//! This is a facade crate that re-exports functionality from the lacuna
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use lacuna_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FileStore::open_default()?;
//!     let coordinator = CacheCoordinator::new(store, MyFetcher::new());
//!
//!     let window = TimeWindow::trailing_days(30);
//!     let response = coordinator
//!         .get_range(&SeriesKey::from("AAPL"), window)
//!         .await?;
//!
//!     for warning in &response.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     println!("{} records", response.len());
//!
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/lacuna/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use lacuna_types::*;

// Re-export storage
#[cfg(feature = "store")]
pub use lacuna_store::{CacheStore, FileStore, StoreError};

// Re-export the fetch seam
#[cfg(feature = "fetch")]
pub use lacuna_fetch::{FetchError, FetchWarning, Fetcher, RetryConfig, RetryingFetcher};

// Re-export the engine
#[cfg(feature = "engine")]
pub use lacuna_engine::{
    CacheCoordinator, CoordinatorConfig, EngineError, RangeResponse, RangeSummary,
    ResponseWarning, coverage,
};

/// Prelude module for convenient imports.
///
/// ```
/// use lacuna_lib::prelude::*;
/// ```
pub mod prelude {
    pub use lacuna_types::{CoverageWindow, Record, SeriesKey, TimeWindow, WindowError};

    #[cfg(feature = "store")]
    pub use lacuna_store::{CacheStore, FileStore, StoreError};

    #[cfg(feature = "fetch")]
    pub use lacuna_fetch::{FetchError, FetchWarning, Fetcher, RetryingFetcher};

    #[cfg(feature = "engine")]
    pub use lacuna_engine::{
        CacheCoordinator, CoordinatorConfig, EngineError, RangeResponse, RangeSummary,
    };
}
