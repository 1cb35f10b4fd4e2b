//! Deduplicated value/count accumulator for one metric and dimension set.
//!
//! A histogram keeps the distinct values seen in the current window together
//! with how often each was seen. A window is emitted as a [`Datapoint`] when
//! the periodic timer fires, when the distinct-value cap is reached, or when
//! [`Histogram::flush`] is called.

use crate::core::MetricConfig;
use crate::metrics::scheduler::FlushScheduler;
use crate::metrics::types::{pascal_case, Datapoint, StatisticValues};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Maximum number of distinct values held by one window
pub const MAX_DISTINCT_VALUES: usize = 150;

/// Default flush interval in seconds
pub const DEFAULT_RESOLUTION: u64 = 60;

/// Receiver of flushed datapoints
pub trait FlushHandler: Send + Sync {
    fn on_flush(&self, datapoint: Datapoint);
}

impl<F> FlushHandler for F
where
    F: Fn(Datapoint) + Send + Sync,
{
    fn on_flush(&self, datapoint: Datapoint) {
        self(datapoint)
    }
}

#[derive(Debug)]
struct Window {
    values: Vec<f64>,
    counts: Vec<u64>,
    started: DateTime<Utc>,
}

impl Window {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            counts: Vec::new(),
            started: Utc::now(),
        }
    }

    fn insert(&mut self, value: f64) {
        match self.values.iter().position(|existing| *existing == value) {
            Some(index) => self.counts[index] += 1,
            None => {
                self.values.push(value);
                self.counts.push(1);
            },
        }
    }
}

/// Aggregation unit for one (metric, dimension set) pair
pub struct Histogram {
    key: String,
    metric_name: String,
    config: MetricConfig,
    window: Mutex<Window>,
    handler: Arc<dyn FlushHandler>,
    scheduler: Arc<FlushScheduler>,
}

impl Histogram {
    /// Create a histogram, starting its timer when `config.auto_start` is set.
    ///
    /// `config.dimensions` must already hold the full dimension set of this
    /// histogram (base plus runtime dimensions).
    pub fn new(
        name: &str,
        config: MetricConfig,
        handler: Arc<dyn FlushHandler>,
        scheduler: Arc<FlushScheduler>,
    ) -> Arc<Self> {
        let histogram = Arc::new(Self {
            key: format!("{}{}", name, config.dimensions.identity()),
            metric_name: pascal_case(name),
            config,
            window: Mutex::new(Window::new()),
            handler,
            scheduler,
        });

        if histogram.config.auto_start.unwrap_or(false) {
            histogram.start();
        }

        histogram
    }

    /// Record one observation and return it unchanged.
    ///
    /// Reaching [`MAX_DISTINCT_VALUES`] distinct values flushes the window
    /// before returning.
    pub fn record(&self, value: f64) -> f64 {
        let full = {
            let mut window = self.window.lock();
            window.insert(value);

            if window.values.len() >= MAX_DISTINCT_VALUES {
                Some(self.take(&mut window))
            } else {
                None
            }
        };

        if let Some(datapoint) = full {
            tracing::debug!(
                metric = %self.metric_name,
                distinct = MAX_DISTINCT_VALUES,
                "Distinct value cap reached, flushing early"
            );
            self.handler.on_flush(datapoint);
        }

        value
    }

    /// Run `f` and record its wall-clock duration in milliseconds
    pub fn measure<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = f();
        self.record(elapsed_ms(start));
        result
    }

    /// Run `f`, await the future it returns and record the time until it settles.
    ///
    /// The output is handed back untouched, so an `Err` from the future still
    /// reaches the caller after its duration has been recorded.
    pub async fn measure_async<F, Fut>(&self, f: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let start = Instant::now();
        let output = f().await;
        self.record(elapsed_ms(start));
        output
    }

    /// Emit the current window and start a new one.
    ///
    /// An empty window is left alone and nothing is emitted. Returns whether a
    /// datapoint was handed to the flush handler.
    pub fn flush(&self) -> bool {
        let datapoint = {
            let mut window = self.window.lock();
            if window.values.is_empty() {
                return false;
            }
            self.take(&mut window)
        };

        tracing::debug!(
            metric = %self.metric_name,
            samples = datapoint.values.len(),
            "Flushing histogram"
        );
        self.handler.on_flush(datapoint);
        true
    }

    /// Build the datapoint for the current window without resetting it.
    ///
    /// An empty window is reported as a single zero sample.
    pub fn snapshot(&self) -> Datapoint {
        self.datapoint(&self.window.lock())
    }

    /// Discard the current window without emitting it
    pub fn reset(&self) {
        *self.window.lock() = Window::new();
    }

    /// Start (or restart) the periodic flush timer
    pub fn start(self: &Arc<Self>) -> bool {
        self.scheduler
            .schedule(&self.key, Arc::downgrade(self), self.interval())
    }

    /// Cancel the periodic flush timer; safe when not started
    pub fn stop(&self) {
        self.scheduler.cancel(&self.key);
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_scheduled(&self.key)
    }

    /// Flush period derived from the configured resolution
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.resolution().max(1))
    }

    pub fn resolution(&self) -> u64 {
        self.config.resolution
    }

    /// Scheduler key: metric name followed by the dimension identity
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// Distinct values of the current window, in first-seen order
    pub fn values(&self) -> Vec<f64> {
        self.window.lock().values.clone()
    }

    /// Occurrence counts parallel to [`Histogram::values`]
    pub fn counts(&self) -> Vec<u64> {
        self.window.lock().counts.clone()
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window.lock().started
    }

    /// Number of distinct values in the current window
    pub fn len(&self) -> usize {
        self.window.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.lock().values.is_empty()
    }

    fn take(&self, window: &mut Window) -> Datapoint {
        let datapoint = self.datapoint(window);
        *window = Window::new();
        datapoint
    }

    fn datapoint(&self, window: &Window) -> Datapoint {
        let (values, counts) = if window.values.is_empty() {
            (vec![0.0], vec![0])
        } else {
            (window.values.clone(), window.counts.clone())
        };

        Datapoint {
            metric_name: self.metric_name.clone(),
            dimensions: self.config.dimensions.clone(),
            timestamp: window.started,
            storage_resolution: self.config.resolution,
            statistic_values: StatisticValues::from_values(&values),
            counts,
            values,
            unit: self.config.unit.clone(),
        }
    }
}

impl Drop for Histogram {
    fn drop(&mut self) {
        self.scheduler.cancel(&self.key);
    }
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram")
            .field("key", &self.key)
            .field("metric_name", &self.metric_name)
            .field("window", &*self.window.lock())
            .finish()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
