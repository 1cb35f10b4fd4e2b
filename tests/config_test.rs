//! Tests for config file discovery and loading.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use stratus_lib::core::Config;
use stratus_lib::metrics::{Collector, DimensionSet};
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
namespace: Test/Service
manualMode: true
transport:
  endpoint: http://localhost:4000/metrics
  timeout: 3s
metrics:
  randomCount:
    unit: Count
    resolution: 1
    dimensions:
      - Name: Stage
        Value: test
  awaitInterval:
    unit: Milliseconds
    autoStart: true
"#;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_discovers_file_in_directory() {
    let dir = TempDir::new().unwrap();
    write(&dir, "metrics.yaml", FULL_CONFIG);

    let config = Config::discover_in(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(config.namespace.as_deref(), Some("Test/Service"));
    assert!(config.manual_mode);
    assert!(!config.disabled);
    assert_eq!(config.transport.timeout, Duration::from_secs(3));
    assert_eq!(config.metrics.len(), 2);

    let random = &config.metrics["randomCount"];
    assert_eq!(random.unit.as_deref(), Some("Count"));
    assert_eq!(random.resolution, 1);
    assert_eq!(random.dimensions, DimensionSet::from_pairs(&[("Stage", "test")]));
    assert!(!config.auto_start_for(random));

    let awaiting = &config.metrics["awaitInterval"];
    assert_eq!(awaiting.resolution, 60);
    assert!(config.auto_start_for(awaiting));
}

#[test]
fn test_explicit_file_path_wins() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let explicit = write(&first, "custom-metrics.yaml", FULL_CONFIG);
    write(&second, "metrics.yaml", "namespace: Other\nmetrics:\n  x: {}\n");

    let config = Config::discover_in(&[explicit, second.path().to_path_buf()]).unwrap();
    assert_eq!(config.namespace.as_deref(), Some("Test/Service"));
}

#[test]
fn test_search_order_follows_roots_and_file_names() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write(&first, ".metricsrc.yaml", "namespace: Hidden\nmetrics:\n  x: {}\n");
    write(&first, "metrics.yml", "namespace: Short\nmetrics:\n  x: {}\n");
    write(&second, "metrics.yaml", "namespace: Second\nmetrics:\n  x: {}\n");

    let config =
        Config::discover_in(&[first.path().to_path_buf(), second.path().to_path_buf()]).unwrap();
    assert_eq!(config.namespace.as_deref(), Some("Short"));
}

#[test]
fn test_missing_file_disables_metrics() {
    let dir = TempDir::new().unwrap();

    let config = Config::discover_in(&[dir.path().to_path_buf()]).unwrap();
    assert!(config.disabled);
    assert!(config.metrics.is_empty());
}

#[test]
fn test_file_without_metrics_disables_metrics() {
    let dir = TempDir::new().unwrap();
    write(&dir, "metrics.yaml", "namespace: Test/Service\n");

    let config = Config::discover_in(&[dir.path().to_path_buf()]).unwrap();
    assert!(config.disabled);
}

#[test]
fn test_file_without_namespace_disables_metrics() {
    let dir = TempDir::new().unwrap();
    write(&dir, "metrics.yaml", "metrics:\n  randomCount:\n    unit: Count\n");

    let config = Config::discover_in(&[dir.path().to_path_buf()]).unwrap();
    assert!(config.disabled);
    assert_eq!(config.metrics.len(), 1);
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let dir = TempDir::new().unwrap();
    write(&dir, "metrics.yaml", "namespace: [unclosed\n");

    assert!(Config::discover_in(&[dir.path().to_path_buf()]).is_err());
}

#[test]
fn test_invalid_values_are_an_error() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "metrics.yaml",
        "namespace: Test/Service\nmetrics:\n  randomCount:\n    resolution: 0\n",
    );

    let err = Config::discover_in(&[dir.path().to_path_buf()]).unwrap_err();
    assert!(err.to_string().contains("resolution"));
}

#[test]
fn test_load_requires_a_readable_file() {
    let dir = TempDir::new().unwrap();
    assert!(Config::load(&dir.path().join("absent.yaml")).is_err());

    let path = write(&dir, "metrics.yaml", FULL_CONFIG);
    assert_eq!(Config::load(&path).unwrap().metrics.len(), 2);
}

#[tokio::test]
async fn test_discovered_disabled_config_builds_a_collector() {
    let dir = TempDir::new().unwrap();
    let config = Config::discover_in(&[dir.path().to_path_buf()]).unwrap();

    let collector = Collector::from_config(config).unwrap();
    assert!(collector.is_disabled());
    assert_eq!(collector.running_timers(), 0);
    assert!(!collector.record("anything", 1.0).is_recorded());
}
