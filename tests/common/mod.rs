//! Common test utilities and fixtures.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stratus_lib::core::{Config, ConfigBuilder, MetricConfig, Result, StratusError};
use stratus_lib::metrics::Collector;
use stratus_lib::transport::{PutMetricDataRequest, Transport};

/// Transport that keeps every request it receives.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<PutMetricDataRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<PutMetricDataRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Wait until at least `expected` requests arrived
    pub async fn wait_for(&self, expected: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.calls() < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("transport was not called in time");
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn put_metric_data(&self, request: &PutMetricDataRequest) -> Result<()> {
        self.requests.lock().push(request.clone());
        Ok(())
    }
}

/// Transport that fails every request.
#[derive(Default)]
pub struct FailingTransport {
    calls: AtomicUsize,
}

impl FailingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for FailingTransport {
    async fn put_metric_data(&self, _request: &PutMetricDataRequest) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StratusError::transport("testing"))
    }
}

/// Manual-mode config with the given metrics
pub fn manual_config(metrics: &[(&str, MetricConfig)]) -> Config {
    metrics
        .iter()
        .fold(
            ConfigBuilder::new().namespace("test/namespace").manual_mode(true),
            |builder, (name, metric)| builder.metric(*name, metric.clone()),
        )
        .build()
        .expect("valid test config")
}

pub fn manual_collector(metrics: &[(&str, MetricConfig)], transport: Arc<dyn Transport>) -> Collector {
    Collector::new(manual_config(metrics), transport).expect("valid collector")
}
