//! Submission of datapoint batches to the remote ingestion endpoint.
//!
//! The endpoint is opaque to the aggregation pipeline: a [`Transport`] takes
//! one [`PutMetricDataRequest`] and either acknowledges it or fails.

pub mod http;

use crate::core::Result;
use crate::metrics::types::Datapoint;
use serde::{Deserialize, Serialize};

pub use http::HttpTransport;

/// One batch for one namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutMetricDataRequest {
    pub namespace: String,
    pub metric_data: Vec<Datapoint>,
}

/// Trait for ingestion endpoint implementations.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Submit one batch as a single request.
    async fn put_metric_data(&self, request: &PutMetricDataRequest) -> Result<()>;
}

/// Transport that acknowledges every batch without sending it anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransport;

#[async_trait::async_trait]
impl Transport for NoopTransport {
    async fn put_metric_data(&self, request: &PutMetricDataRequest) -> Result<()> {
        tracing::debug!(
            namespace = %request.namespace,
            datapoints = request.metric_data.len(),
            "Discarding batch"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_transport_accepts() {
        let request = PutMetricDataRequest {
            namespace: "Test/Service".to_string(),
            metric_data: Vec::new(),
        };
        assert!(NoopTransport.put_metric_data(&request).await.is_ok());
    }

    #[test]
    fn test_request_wire_names() {
        let request = PutMetricDataRequest {
            namespace: "Test/Service".to_string(),
            metric_data: Vec::new(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"Namespace":"Test/Service","MetricData":[]}"#);
    }
}
