//! In-process metrics aggregation.
//!
//! Observations flow through three layers:
//! - [`Histogram`]: distinct values and their counts for one metric and dimension set
//! - [`MetricRouter`]: the histograms of one metric, keyed by dimension identity
//! - [`Collector`]: every router of a namespace plus the outbound batch
//!
//! Histograms flush on a timer, when they hold [`MAX_DISTINCT_VALUES`]
//! distinct values, or on demand. The collector submits its batch when it
//! reaches [`MAX_BATCH_SIZE`] datapoints or on an explicit flush.

pub mod collector;
pub mod facade;
pub mod histogram;
pub mod router;
pub mod scheduler;
pub mod types;

pub use collector::{Collector, SubmitOutcome, MAX_BATCH_SIZE};
pub use facade::{Dispatch, MetricHandle};
pub use histogram::{FlushHandler, Histogram, DEFAULT_RESOLUTION, MAX_DISTINCT_VALUES};
pub use router::MetricRouter;
pub use scheduler::FlushScheduler;
pub use types::{pascal_case, Datapoint, Dimension, DimensionSet, StatisticValues};
