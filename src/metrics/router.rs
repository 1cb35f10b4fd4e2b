//! Routing of observations to the histogram of their dimension set.

use crate::core::MetricConfig;
use crate::metrics::histogram::{FlushHandler, Histogram};
use crate::metrics::scheduler::FlushScheduler;
use crate::metrics::types::DimensionSet;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;

/// Owns every histogram of one metric, keyed by dimension identity.
///
/// The default histogram (no runtime dimensions) exists from construction;
/// the others are created on first use and live as long as the router.
pub struct MetricRouter {
    name: String,
    config: MetricConfig,
    default: Arc<Histogram>,
    by_dimensions: DashMap<String, Arc<Histogram>>,
    handler: Arc<dyn FlushHandler>,
    scheduler: Arc<FlushScheduler>,
}

impl MetricRouter {
    pub fn new(
        name: impl Into<String>,
        config: MetricConfig,
        handler: Arc<dyn FlushHandler>,
        scheduler: Arc<FlushScheduler>,
    ) -> Self {
        let name = name.into();
        let default = Histogram::new(&name, config.clone(), handler.clone(), scheduler.clone());

        Self {
            name,
            config,
            default,
            by_dimensions: DashMap::new(),
            handler,
            scheduler,
        }
    }

    /// Histogram for `dimensions`, created on first use.
    ///
    /// `None` or an empty set selects the default histogram. A new histogram
    /// carries the base dimensions followed by the runtime ones.
    pub fn resolve(&self, dimensions: Option<&DimensionSet>) -> Arc<Histogram> {
        let runtime = match dimensions {
            Some(runtime) if !runtime.is_empty() => runtime,
            _ => return self.default.clone(),
        };

        let identity = runtime.identity();
        if let Some(existing) = self.by_dimensions.get(&identity) {
            return existing.clone();
        }

        self.by_dimensions
            .entry(identity)
            .or_insert_with(|| {
                tracing::debug!(
                    metric = %self.name,
                    dimensions = runtime.len(),
                    "Creating histogram for new dimension set"
                );
                let config = MetricConfig {
                    dimensions: self.config.dimensions.extend_with(runtime),
                    ..self.config.clone()
                };
                Histogram::new(&self.name, config, self.handler.clone(), self.scheduler.clone())
            })
            .clone()
    }

    /// Record `value` on the histogram for `dimensions`
    pub fn record(&self, value: f64, dimensions: Option<&DimensionSet>) -> f64 {
        self.resolve(dimensions).record(value)
    }

    /// Time `f` on the histogram for `dimensions`
    pub fn measure<F, T>(&self, f: F, dimensions: Option<&DimensionSet>) -> T
    where
        F: FnOnce() -> T,
    {
        self.resolve(dimensions).measure(f)
    }

    /// Time the future returned by `f` on the histogram for `dimensions`
    pub async fn measure_async<F, Fut>(&self, f: F, dimensions: Option<&DimensionSet>) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let histogram = self.resolve(dimensions);
        histogram.measure_async(f).await
    }

    /// Apply `f` to every histogram, default first
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<Histogram>),
    {
        f(&self.default);

        // Collect first so `f` can call back into the router without holding a shard lock
        let others: Vec<Arc<Histogram>> = self
            .by_dimensions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        others.iter().for_each(f);
    }

    pub fn flush(&self) {
        self.for_each(|h| {
            h.flush();
        });
    }

    pub fn start(&self) {
        self.for_each(|h| {
            h.start();
        });
    }

    pub fn stop(&self) {
        self.for_each(|h| h.stop());
    }

    pub fn reset(&self) {
        self.for_each(|h| h.reset());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// Number of histograms, default included
    pub fn len(&self) -> usize {
        1 + self.by_dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for MetricRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRouter")
            .field("name", &self.name)
            .field("histograms", &self.len())
            .finish()
    }
}
