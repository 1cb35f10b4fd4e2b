//! Name-based dispatch over the configured metrics.
//!
//! Instrumentation call sites refer to metrics by name. A name that is not
//! configured is reported with a warning and the wrapped work still runs, so
//! removing a metric from the config never changes application behavior.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use stratus_lib::core::{ConfigBuilder, MetricConfig};
//! # use stratus_lib::metrics::Collector;
//! # use stratus_lib::transport::NoopTransport;
//! # async fn demo() -> stratus_lib::Result<()> {
//! let config = ConfigBuilder::new()
//!     .namespace("Test/Service")
//!     .metric("awaitInterval", MetricConfig::default().unit("Milliseconds"))
//!     .build()?;
//! let metrics = Collector::new(config, Arc::new(NoopTransport))?;
//!
//! let answer = metrics
//!     .metric("awaitInterval")
//!     .measure_async(|| async { 42 })
//!     .await
//!     .into_inner();
//! metrics.flush().await;
//! # Ok(())
//! # }
//! ```

use crate::metrics::collector::Collector;
use crate::metrics::router::MetricRouter;
use crate::metrics::types::DimensionSet;
use std::future::Future;

/// Outcome of a name-based call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch<T> {
    /// The metric exists and the observation was recorded
    Recorded(T),
    /// The metric is not configured; nothing was recorded
    Unknown(T),
}

impl<T> Dispatch<T> {
    /// The recorded value or the wrapped work's result
    pub fn into_inner(self) -> T {
        match self {
            Dispatch::Recorded(value) | Dispatch::Unknown(value) => value,
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, Dispatch::Recorded(_))
    }
}

fn warn_unknown(name: &str) {
    tracing::warn!("Warning, metric \"{}\" is not defined, skipping collection.", name);
}

impl Collector {
    /// Record `value` on the metric called `name`
    pub fn record(&self, name: &str, value: f64) -> Dispatch<f64> {
        self.metric(name).record(value)
    }

    /// Time `f` on the metric called `name`
    pub fn measure<F, T>(&self, name: &str, f: F) -> Dispatch<T>
    where
        F: FnOnce() -> T,
    {
        self.metric(name).measure(f)
    }

    /// Time the future returned by `f` on the metric called `name`
    pub async fn measure_async<F, Fut>(&self, name: &str, f: F) -> Dispatch<Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        self.metric(name).measure_async(f).await
    }

    /// Typed handle for the metric called `name`
    pub fn metric<'a>(&'a self, name: &'a str) -> MetricHandle<'a> {
        MetricHandle {
            name,
            router: self.resolve(name),
            dimensions: None,
        }
    }
}

/// Handle to one metric, optionally narrowed to a dimension set
#[derive(Debug, Clone)]
pub struct MetricHandle<'a> {
    name: &'a str,
    router: Option<&'a MetricRouter>,
    dimensions: Option<DimensionSet>,
}

impl<'a> MetricHandle<'a> {
    /// Route observations to the histogram of `dimensions`
    pub fn with_dimensions(mut self, dimensions: DimensionSet) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Whether the metric is configured
    pub fn exists(&self) -> bool {
        self.router.is_some()
    }

    pub fn record(&self, value: f64) -> Dispatch<f64> {
        match self.router {
            Some(router) => Dispatch::Recorded(router.record(value, self.dimensions.as_ref())),
            None => {
                warn_unknown(self.name);
                Dispatch::Unknown(value)
            },
        }
    }

    pub fn measure<F, T>(&self, f: F) -> Dispatch<T>
    where
        F: FnOnce() -> T,
    {
        match self.router {
            Some(router) => Dispatch::Recorded(router.measure(f, self.dimensions.as_ref())),
            None => {
                warn_unknown(self.name);
                Dispatch::Unknown(f())
            },
        }
    }

    pub async fn measure_async<F, Fut>(&self, f: F) -> Dispatch<Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        match self.router {
            Some(router) => {
                Dispatch::Recorded(router.measure_async(f, self.dimensions.as_ref()).await)
            },
            None => {
                warn_unknown(self.name);
                Dispatch::Unknown(f().await)
            },
        }
    }
}
