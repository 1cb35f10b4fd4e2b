//! JSON-over-HTTP transport.

use super::{PutMetricDataRequest, Transport};
use crate::core::{Result, StratusError, TransportConfig};
use std::time::Duration;

/// POSTs each batch as a JSON body to a fixed endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for `endpoint` with the given request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: None,
            timeout,
        })
    }

    /// Build from the `transport` section of the config
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| StratusError::config("transport endpoint is not configured"))?;

        let mut transport = Self::new(endpoint, config.timeout)?;
        transport.token = config.token.clone();
        Ok(transport)
    }

    /// Send `token` as a bearer token on every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn put_metric_data(&self, request: &PutMetricDataRequest) -> Result<()> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                StratusError::Timeout {
                    timeout_ms: timeout_ms(self.timeout),
                }
            } else {
                StratusError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StratusError::transport(format!(
                "endpoint responded with {}: {}",
                status, body
            )));
        }

        tracing::debug!(
            namespace = %request.namespace,
            datapoints = request.metric_data.len(),
            status = %status,
            "Batch accepted"
        );
        Ok(())
    }
}

/// Timeout in whole milliseconds, saturating at `u64::MAX`
fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
