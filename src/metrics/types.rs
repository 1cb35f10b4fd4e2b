//! Wire-level metric types.
//!
//! Field names serialize in PascalCase so a [`Datapoint`] can be handed to the
//! ingestion endpoint without any further mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single name/value label attached to an observation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    /// Label name (e.g. `Function`)
    pub name: String,
    /// Label value (e.g. `getPostcode`)
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered sequence of dimensions.
///
/// Order is significant: two sets share an identity only when their
/// serialized forms are textually equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionSet(Vec<Dimension>);

impl DimensionSet {
    /// Create an empty set
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Create a set from `(name, value)` pairs, keeping their order
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(pairs.iter().map(|(n, v)| Dimension::new(*n, *v)).collect())
    }

    /// Compact JSON rendering used as the routing key.
    pub fn identity(&self) -> String {
        let pairs: Vec<Value> = self
            .0
            .iter()
            .map(|d| json!({ "Name": d.name, "Value": d.value }))
            .collect();
        Value::Array(pairs).to_string()
    }

    /// Returns a new set holding `self` followed by `other`
    pub fn extend_with(&self, other: &DimensionSet) -> DimensionSet {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().cloned());
        DimensionSet(merged)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dimension> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Dimension>> for DimensionSet {
    fn from(dimensions: Vec<Dimension>) -> Self {
        Self(dimensions)
    }
}

impl FromIterator<Dimension> for DimensionSet {
    fn from_iter<I: IntoIterator<Item = Dimension>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Summary statistics over the distinct values of one window.
///
/// `sum`, `maximum` and `minimum` ignore occurrence counts and `sample_count`
/// is the number of distinct values. Downstream consumers rely on this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatisticValues {
    pub sample_count: u64,
    pub maximum: f64,
    pub minimum: f64,
    pub sum: f64,
}

impl StatisticValues {
    /// Derive statistics from a non-empty slice of distinct values
    pub fn from_values(values: &[f64]) -> Self {
        let (minimum, maximum, sum) = values.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
        );

        Self {
            sample_count: values.len() as u64,
            maximum,
            minimum,
            sum,
        }
    }
}

/// Immutable snapshot emitted by one histogram flush
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Datapoint {
    /// PascalCase metric name
    pub metric_name: String,
    pub dimensions: DimensionSet,
    /// Start of the accumulation window
    pub timestamp: DateTime<Utc>,
    /// Flush interval in seconds
    pub storage_resolution: u64,
    pub counts: Vec<u64>,
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub statistic_values: StatisticValues,
}

/// Convert a configured metric name to the identifier used on the wire.
///
/// Splits on every non-alphanumeric character and upper-cases the first
/// character of each segment: `awaitInterval` -> `AwaitInterval`,
/// `db_query-time` -> `DbQueryTime`.
pub fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .flat_map(|segment| {
            let mut chars = segment.chars();
            let head = chars.next().map(|c| c.to_uppercase().collect::<String>());
            head.into_iter().chain(std::iter::once(chars.as_str().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("testMetric"), "TestMetric");
        assert_eq!(pascal_case("awaitInterval"), "AwaitInterval");
        assert_eq!(pascal_case("db_query-time"), "DbQueryTime");
        assert_eq!(pascal_case("Already"), "Already");
        assert_eq!(pascal_case("__"), "");
    }

    #[test]
    fn test_identity_matches_equal_content() {
        let a = DimensionSet::from_pairs(&[("Function", "X")]);
        let b = DimensionSet::from(vec![Dimension::new("Function", "X")]);
        let c = DimensionSet::from_pairs(&[("Function", "Y")]);

        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
        assert_eq!(a.identity(), r#"[{"Name":"Function","Value":"X"}]"#);
    }

    #[test]
    fn test_identity_is_order_sensitive() {
        let a = DimensionSet::from_pairs(&[("a", "1"), ("b", "2")]);
        let b = DimensionSet::from_pairs(&[("b", "2"), ("a", "1")]);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_extend_with_appends() {
        let base = DimensionSet::from_pairs(&[("Service", "api")]);
        let runtime = DimensionSet::from_pairs(&[("Function", "X")]);
        let merged = base.extend_with(&runtime);

        let names: Vec<&str> = merged.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Service", "Function"]);
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_statistics_are_unweighted() {
        let stats = StatisticValues::from_values(&[5.0, 7.0]);
        assert_eq!(stats.sample_count, 2);
        assert_eq!(stats.maximum, 7.0);
        assert_eq!(stats.minimum, 5.0);
        assert_eq!(stats.sum, 12.0);
    }

    #[test]
    fn test_datapoint_wire_names() {
        let datapoint = Datapoint {
            metric_name: "TestMetric".to_string(),
            dimensions: DimensionSet::from_pairs(&[("test", "value")]),
            timestamp: Utc::now(),
            storage_resolution: 60,
            counts: vec![1],
            values: vec![15.0],
            unit: None,
            statistic_values: StatisticValues::from_values(&[15.0]),
        };

        let json = serde_json::to_value(&datapoint).unwrap();
        assert_eq!(json["MetricName"], "TestMetric");
        assert_eq!(json["Dimensions"][0]["Name"], "test");
        assert_eq!(json["StorageResolution"], 60);
        assert_eq!(json["StatisticValues"]["SampleCount"], 1);
        assert!(json.get("Unit").is_none());
    }
}
