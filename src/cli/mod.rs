//! Command-line interface for Stratus.
//!
//! Loads a metrics configuration, then either validates it or drives a short
//! demo load through the collector and flushes it to the configured endpoint.

use crate::core::{Config, Result, StratusError};
use crate::metrics::{Collector, SubmitOutcome};
use crate::transport::{NoopTransport, Transport};
use clap::Parser;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// In-process metrics aggregator demo and config checker
#[derive(Parser, Debug)]
#[command(name = "stratus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: discovered from METRICS_CONFIG_PATH or the working directory)
    #[arg(short, long, env = "STRATUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "STRATUS_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,

    /// Aggregate but discard batches instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Metric to drive (default: first configured metric)
    #[arg(long)]
    pub metric: Option<String>,

    /// Number of random samples to record
    #[arg(long, default_value = "100")]
    pub samples: usize,

    /// Upper bound (exclusive) of the random sample values
    #[arg(long, default_value = "10")]
    pub max: u32,

    /// Duration of the measured sleep
    #[arg(long, default_value = "250ms", value_parser = humantime_serde::re::humantime::parse_duration)]
    pub sleep: Duration,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration from the explicit path or by discovery.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load(path),
            None => Config::discover(),
        }
    }

    /// Initialize logging based on flags and environment.
    pub fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level =
            std::env::var("STRATUS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .try_init()
            .map_err(|e| StratusError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute the Stratus CLI.
pub async fn execute(cli: Cli) -> Result<()> {
    cli.init_logging()?;

    let config = cli.load_config()?;

    if cli.check_config {
        config.validate()?;
        println!("Configuration is valid!");
        println!("  Namespace: {}", config.namespace.as_deref().unwrap_or("<none>"));
        println!("  Disabled: {}", config.disabled);
        println!("  Manual mode: {}", config.manual_mode);
        for (name, metric) in &config.metrics {
            println!(
                "  Metric {}: resolution {}s, unit {}, {} base dimension(s)",
                name,
                metric.resolution,
                metric.unit.as_deref().unwrap_or("-"),
                metric.dimensions.len()
            );
        }
        return Ok(());
    }

    let collector = if cli.dry_run {
        let transport: Arc<dyn Transport> = Arc::new(NoopTransport);
        Collector::new(config, transport)?
    } else {
        Collector::from_config(config)?
    };

    run_demo(&cli, &collector).await
}

/// Record random samples and one measured sleep, then flush and stop
async fn run_demo(cli: &Cli, collector: &Collector) -> Result<()> {
    let name = match &cli.metric {
        Some(name) => name.clone(),
        None => collector
            .metric_names()
            .next()
            .map(str::to_string)
            .ok_or_else(|| StratusError::config("no metrics configured"))?,
    };

    let handle = collector.metric(&name);
    if !handle.exists() {
        return Err(StratusError::config(format!("metric '{}' is not configured", name)));
    }

    tracing::info!(metric = %name, samples = cli.samples, "Recording demo samples");
    let mut rng = rand::thread_rng();
    for _ in 0..cli.samples {
        handle.record(f64::from(rng.gen_range(1..cli.max.max(2))));
    }

    let sleep = cli.sleep;
    let result = handle
        .measure_async(|| async move {
            tokio::time::sleep(sleep).await;
            123_456
        })
        .await
        .into_inner();
    tracing::debug!(result, "Measured sleep finished");

    let outcome = collector.flush().await;
    collector.stop();

    match outcome {
        SubmitOutcome::Sent { datapoints } => println!("Submitted {} datapoint(s)", datapoints),
        SubmitOutcome::Disabled { discarded } => {
            println!("Collector disabled, discarded {} datapoint(s)", discarded)
        },
        SubmitOutcome::Dropped { datapoints } => {
            println!("Submission failed, dropped {} datapoint(s)", datapoints)
        },
        SubmitOutcome::Empty => println!("Nothing to submit"),
    }

    Ok(())
}
