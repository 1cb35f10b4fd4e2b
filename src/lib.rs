//! Stratus - in-process metrics aggregation.
//!
//! Application code records counts and timings under named metrics. Stratus
//! deduplicates them into per-dimension histograms, summarizes each window
//! and periodically submits batches of datapoints to a remote time-series
//! ingestion endpoint.
//!
//! # Features
//!
//! - **Bounded memory**: at most 150 distinct values per histogram window and
//!   20 datapoints per pending batch
//! - **Dimension routing**: one histogram per distinct dimension set, created
//!   on first use
//! - **Latency instrumentation**: time sync closures and futures without
//!   changing their results or errors
//! - **Never fails the caller**: transport errors are logged, not propagated
//!
//! # Architecture
//!
//! - `metrics`: histograms, routers, the collector and name-based dispatch
//! - `transport`: submission of batches to the ingestion endpoint
//! - `core`: configuration and errors
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use stratus_lib::core::Config;
//! use stratus_lib::metrics::Collector;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::discover()?;
//!     let metrics = Collector::from_config(config)?;
//!
//!     metrics.record("randomCount", 4.0);
//!     metrics.flush().await;
//!     metrics.stop();
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod metrics;
pub mod transport;

// Re-export core types for convenience
pub use crate::core::{Config, Result, StratusError};
pub use crate::metrics::{Collector, Dispatch, SubmitOutcome};
