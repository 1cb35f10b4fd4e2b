//! Configuration and error types shared by the whole crate.

#![warn(missing_docs)]

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, MetricConfig, TransportConfig};
pub use error::{Result, StratusError};
