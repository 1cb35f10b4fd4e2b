//! Namespace-wide batching and submission.
//!
//! The collector owns one [`MetricRouter`] per configured metric. Every
//! histogram flush lands in the pending batch; the batch is submitted when it
//! reaches [`MAX_BATCH_SIZE`] or when the collector is flushed explicitly.
//! Submission failures are logged and swallowed so that instrumentation can
//! never break the code it instruments.

use crate::core::{Config, Result};
use crate::metrics::histogram::FlushHandler;
use crate::metrics::router::MetricRouter;
use crate::metrics::scheduler::FlushScheduler;
use crate::metrics::types::Datapoint;
use crate::transport::{HttpTransport, NoopTransport, PutMetricDataRequest, Transport};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Batch length that forces an immediate submission
pub const MAX_BATCH_SIZE: usize = 20;

/// Result of one submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was pending; no request is sent instead of an empty `MetricData` list
    Empty,
    /// Collector is disabled; the batch was discarded without a request
    Disabled { discarded: usize },
    /// The endpoint acknowledged the batch
    Sent { datapoints: usize },
    /// The request failed and the batch is lost
    Dropped { datapoints: usize },
}

/// Pending batch plus everything needed to send it.
///
/// Shared between the collector and every histogram flush handler.
struct Batcher {
    namespace: String,
    disabled: bool,
    batch: Mutex<Vec<Datapoint>>,
    transport: Arc<dyn Transport>,
    runtime: Option<Handle>,
}

impl Batcher {
    fn take(&self) -> Vec<Datapoint> {
        std::mem::take(&mut *self.batch.lock())
    }

    fn request(&self, metric_data: Vec<Datapoint>) -> PutMetricDataRequest {
        PutMetricDataRequest {
            namespace: self.namespace.clone(),
            metric_data,
        }
    }
}

impl FlushHandler for Batcher {
    fn on_flush(&self, datapoint: Datapoint) {
        let full = {
            let mut batch = self.batch.lock();
            batch.push(datapoint);
            if batch.len() >= MAX_BATCH_SIZE {
                Some(std::mem::take(&mut *batch))
            } else {
                None
            }
        };

        let Some(snapshot) = full else {
            return;
        };

        if self.disabled {
            tracing::debug!(discarded = snapshot.len(), "Collector disabled, discarding full batch");
            return;
        }

        match self.runtime.clone().or_else(|| Handle::try_current().ok()) {
            Some(runtime) => {
                let request = self.request(snapshot);
                let transport = self.transport.clone();
                runtime.spawn(async move {
                    send(transport.as_ref(), &request).await;
                });
            },
            None => {
                tracing::warn!(
                    "Error pushing {} datapoints: no async runtime available",
                    snapshot.len()
                );
            },
        }
    }
}

/// Submit `request`, logging instead of failing
async fn send(transport: &dyn Transport, request: &PutMetricDataRequest) -> SubmitOutcome {
    let datapoints = request.metric_data.len();

    match transport.put_metric_data(request).await {
        Ok(()) => {
            tracing::debug!(namespace = %request.namespace, datapoints, "Submitted batch");
            SubmitOutcome::Sent { datapoints }
        },
        Err(e) => {
            tracing::warn!("Error pushing {} datapoints.", datapoints);
            tracing::error!(category = e.category(), "{}", e);
            SubmitOutcome::Dropped { datapoints }
        },
    }
}

/// Owns every metric of one namespace and batches their datapoints
pub struct Collector {
    routers: BTreeMap<String, MetricRouter>,
    batcher: Arc<Batcher>,
    scheduler: Arc<FlushScheduler>,
}

impl Collector {
    /// Build a collector that submits through `transport`.
    ///
    /// Fails when the configuration is invalid. Histogram timers start here
    /// unless the collector is in manual mode or disabled. The calling tokio
    /// runtime, if any, is captured for timers and background submissions so
    /// plain threads can record too.
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let runtime = Handle::try_current().ok();
        let batcher = Arc::new(Batcher {
            namespace: config.namespace.clone().unwrap_or_default(),
            disabled: config.disabled,
            batch: Mutex::new(Vec::with_capacity(MAX_BATCH_SIZE)),
            transport,
            runtime: runtime.clone(),
        });
        let scheduler = Arc::new(FlushScheduler::with_runtime(runtime));
        let handler: Arc<dyn FlushHandler> = batcher.clone();

        let routers = config
            .metrics
            .iter()
            .map(|(name, metric)| {
                let mut metric = metric.clone();
                metric.auto_start = Some(config.auto_start_for(&metric));
                let router = MetricRouter::new(name.clone(), metric, handler.clone(), scheduler.clone());
                (name.clone(), router)
            })
            .collect();

        tracing::info!(
            namespace = %batcher.namespace,
            disabled = config.disabled,
            manual_mode = config.manual_mode,
            "Metrics collector ready"
        );

        Ok(Self {
            routers,
            batcher,
            scheduler,
        })
    }

    /// Build a collector with the transport described by the config.
    ///
    /// Without an endpoint, batches go to a [`NoopTransport`].
    pub fn from_config(config: Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = match &config.transport.endpoint {
            Some(_) => Arc::new(HttpTransport::from_config(&config.transport)?),
            None => {
                if !config.disabled {
                    tracing::warn!("No transport endpoint configured, batches will be discarded");
                }
                Arc::new(NoopTransport)
            },
        };

        Self::new(config, transport)
    }

    /// Append a flushed datapoint, submitting in the background when the batch is full
    pub fn on_flush(&self, datapoint: Datapoint) {
        self.batcher.on_flush(datapoint);
    }

    /// Take the pending batch and submit it as one request.
    ///
    /// Datapoints flushed while the request is in flight go to the next batch.
    /// Never fails: transport errors are logged and the batch is dropped.
    pub async fn submit(&self) -> SubmitOutcome {
        let snapshot = self.batcher.take();

        if self.batcher.disabled {
            return SubmitOutcome::Disabled {
                discarded: snapshot.len(),
            };
        }

        if snapshot.is_empty() {
            return SubmitOutcome::Empty;
        }

        let request = self.batcher.request(snapshot);
        send(self.batcher.transport.as_ref(), &request).await
    }

    /// Flush every histogram, then submit
    pub async fn flush(&self) -> SubmitOutcome {
        for router in self.routers.values() {
            router.flush();
        }
        self.submit().await
    }

    /// Cancel every flush timer without flushing
    pub fn stop(&self) {
        for router in self.routers.values() {
            router.stop();
        }
    }

    /// Start every flush timer
    pub fn start(&self) {
        for router in self.routers.values() {
            router.start();
        }
    }

    /// Drop the pending batch without submitting it
    pub fn reset(&self) {
        self.batcher.batch.lock().clear();
    }

    /// Whether `name` is a configured metric
    pub fn has(&self, name: &str) -> bool {
        self.routers.contains_key(name)
    }

    /// Router of a configured metric
    pub fn resolve(&self, name: &str) -> Option<&MetricRouter> {
        self.routers.get(name)
    }

    /// Number of datapoints waiting for submission
    pub fn pending(&self) -> usize {
        self.batcher.batch.lock().len()
    }

    pub fn namespace(&self) -> &str {
        &self.batcher.namespace
    }

    pub fn is_disabled(&self) -> bool {
        self.batcher.disabled
    }

    /// Configured metric names in sorted order
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.routers.keys().map(String::as_str)
    }

    /// Number of running flush timers
    pub fn running_timers(&self) -> usize {
        self.scheduler.len()
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("namespace", &self.batcher.namespace)
            .field("disabled", &self.batcher.disabled)
            .field("metrics", &self.routers.len())
            .field("pending", &self.pending())
            .finish()
    }
}
