//! Configuration management for Stratus.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Config file discovery (`METRICS_CONFIG_PATH`, working directory, user config dir)
//! - Programmatic construction through [`ConfigBuilder`]
//! - Validation and defaults

use crate::core::{Result, StratusError};
use crate::metrics::histogram::DEFAULT_RESOLUTION;
use crate::metrics::types::DimensionSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at a config file or a directory holding one
pub const CONFIG_PATH_ENV: &str = "METRICS_CONFIG_PATH";

/// File names probed in every search directory, in order
pub const CONFIG_FILE_NAMES: [&str; 3] = ["metrics.yaml", "metrics.yml", ".metricsrc.yaml"];

/// Complete configuration for one collector namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Namespace the datapoints are submitted under
    pub namespace: Option<String>,
    /// Do not start flush timers; callers flush explicitly
    #[serde(alias = "manualMode")]
    pub manual_mode: bool,
    /// Aggregate locally but never submit
    pub disabled: bool,
    /// Ingestion endpoint settings
    pub transport: TransportConfig,
    /// Metric name to per-metric options
    pub metrics: BTreeMap<String, MetricConfig>,
}

/// Per-metric options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// Unit string passed through to the endpoint
    pub unit: Option<String>,
    /// Flush interval in seconds
    pub resolution: u64,
    /// Base dimensions of every histogram of this metric
    pub dimensions: DimensionSet,
    /// Start flush timers on construction; inherits the collector mode when unset
    #[serde(alias = "autoStart")]
    pub auto_start: Option<bool>,
}

/// Ingestion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// URL the batches are POSTed to
    pub endpoint: Option<String>,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Bearer token sent with every request
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: None,
            manual_mode: false,
            disabled: false,
            transport: TransportConfig::default(),
            metrics: BTreeMap::new(),
        }
    }
}

impl Default for MetricConfig {
    fn default() -> Self {
        MetricConfig {
            unit: None,
            resolution: DEFAULT_RESOLUTION,
            dimensions: DimensionSet::empty(),
            auto_start: None,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            endpoint: None,
            timeout: Duration::from_secs(10),
            token: None,
        }
    }
}

impl MetricConfig {
    /// Set the unit
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the resolution in seconds
    pub fn resolution(mut self, seconds: u64) -> Self {
        self.resolution = seconds;
        self
    }

    /// Set the base dimensions
    pub fn dimensions(mut self, dimensions: DimensionSet) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Force the timer on or off regardless of collector mode
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = Some(auto_start);
        self
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.disabled {
            match self.namespace.as_deref() {
                Some(namespace) if !namespace.trim().is_empty() => {},
                _ => return Err(StratusError::config("namespace must be set")),
            }
        }

        for (name, metric) in &self.metrics {
            if name.trim().is_empty() {
                return Err(StratusError::config("metric names must not be blank"));
            }

            if metric.resolution == 0 {
                return Err(StratusError::config(format!(
                    "resolution for metric '{}' must be greater than 0",
                    name
                )));
            }

            if metric.dimensions.iter().any(|d| d.name.trim().is_empty()) {
                return Err(StratusError::config(format!(
                    "metric '{}' has a dimension without a name",
                    name
                )));
            }
        }

        if let Some(endpoint) = &self.transport.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(StratusError::config(format!(
                    "transport endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }

        Ok(())
    }

    /// Effective auto-start flag for a metric
    pub fn auto_start_for(&self, metric: &MetricConfig) -> bool {
        metric
            .auto_start
            .unwrap_or(!self.manual_mode && !self.disabled)
    }

    /// Load and validate a YAML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StratusError::config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        ConfigBuilder::new().from_yaml(&content)?.build()
    }

    /// Locate and load the config file.
    ///
    /// Search order: [`CONFIG_PATH_ENV`], the working directory, then the
    /// user config directory. A missing file, or one without a namespace or
    /// metrics, yields a disabled config.
    pub fn discover() -> Result<Self> {
        let mut roots = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            roots.push(PathBuf::from(path));
        }
        if let Ok(cwd) = std::env::current_dir() {
            roots.push(cwd);
        }
        if let Some(dir) = dirs::config_dir() {
            roots.push(dir.join("stratus"));
        }

        Self::discover_in(&roots)
    }

    /// [`Config::discover`] over an explicit list of files or directories
    pub fn discover_in(roots: &[PathBuf]) -> Result<Self> {
        let Some(path) = roots.iter().find_map(|root| find_config_file(root)) else {
            tracing::warn!("No metrics configuration found, metrics are disabled");
            return Ok(Self::disabled());
        };

        tracing::info!("Loading metrics configuration from {:?}", path);
        let content = std::fs::read_to_string(&path)?;
        let mut config: Config = serde_yaml::from_str(&content).map_err(|e| {
            StratusError::config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let has_namespace = config
            .namespace
            .as_deref()
            .is_some_and(|ns| !ns.trim().is_empty());
        if !has_namespace || config.metrics.is_empty() {
            tracing::warn!("Metrics configuration has no namespace or no metrics, metrics are disabled");
            config.disabled = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// A config that aggregates nothing and submits nothing
    pub fn disabled() -> Self {
        Config {
            disabled: true,
            ..Config::default()
        }
    }
}

fn find_config_file(root: &Path) -> Option<PathBuf> {
    if root.is_file() {
        return Some(root.to_path_buf());
    }

    CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|candidate| candidate.is_file())
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| StratusError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Set manual mode
    pub fn manual_mode(mut self, manual: bool) -> Self {
        self.config.manual_mode = manual;
        self
    }

    /// Disable submission
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.config.disabled = disabled;
        self
    }

    /// Set ingestion endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.transport.endpoint = Some(endpoint.into());
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.transport.timeout = timeout;
        self
    }

    /// Add or replace a metric
    pub fn metric(mut self, name: impl Into<String>, metric: MetricConfig) -> Self {
        self.config.metrics.insert(name.into(), metric);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
