//! Canonical metrics model produced by scrapers.
//!
//! A [`MetricsBatch`] is a list of [`ResourceMetrics`]; each groups the
//! [`Metric`]s that describe one resource (the host itself, or a single
//! process). Every metric holds an ordered list of [`DataPoint`]s carrying a
//! flat string attribute map and exactly one numeric value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data point attributes (e.g. `device=sda`, `direction=read`).
pub type Attributes = BTreeMap<String, String>;

/// Nanoseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

const NANOS_PER_SEC: u64 = 1_000_000_000;

impl Timestamp {
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Convert whole seconds since the epoch (e.g. a boot time) to a timestamp.
    pub const fn from_unix_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Current wall-clock time.
    ///
    /// Returns the epoch if the clock is before 1970 or past the range of `i64` nanoseconds.
    pub fn now() -> Self {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
        Self(u64::try_from(nanos).unwrap_or(0))
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Seconds elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn seconds_since(self, earlier: Timestamp) -> f64 {
        self.0.saturating_sub(earlier.0) as f64 / NANOS_PER_SEC as f64
    }
}

/// Numeric value of a data point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberValue {
    Int(i64),
    Double(f64),
}

impl NumberValue {
    /// The value widened to `f64`.
    pub fn as_f64(&self) -> f64 {
        match self {
            NumberValue::Int(v) => *v as f64,
            NumberValue::Double(v) => *v,
        }
    }
}

impl From<i64> for NumberValue {
    fn from(v: i64) -> Self {
        NumberValue::Int(v)
    }
}

impl From<f64> for NumberValue {
    fn from(v: f64) -> Self {
        NumberValue::Double(v)
    }
}

/// A single (interval, attributes, value) sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Start of the cumulative interval. Absent for gauges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<Timestamp>,

    /// When the sample was taken.
    pub timestamp: Timestamp,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,

    pub value: NumberValue,
}

impl DataPoint {
    /// Create a data point without a start timestamp.
    pub fn new(timestamp: Timestamp, value: impl Into<NumberValue>) -> Self {
        Self {
            start_timestamp: None,
            timestamp,
            attributes: Attributes::new(),
            value: value.into(),
        }
    }

    /// Set the start of the cumulative interval.
    pub fn with_start(mut self, start: Timestamp) -> Self {
        self.start_timestamp = Some(start);
        self
    }

    /// Add an attribute to this data point.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute value by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Aggregation shape of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum MetricShape {
    /// Cumulative sum relative to each point's start timestamp.
    Sum { monotonic: bool },
    /// Instantaneous value.
    Gauge,
}

impl MetricShape {
    pub fn is_sum(&self) -> bool {
        matches!(self, MetricShape::Sum { .. })
    }
}

/// A named metric and its data points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub unit: String,
    pub shape: MetricShape,
    #[serde(default)]
    pub data_points: Vec<DataPoint>,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        shape: MetricShape,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
            shape,
            data_points: Vec::new(),
        }
    }
}

/// Typed value of a resource attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Bool(bool),
    StrList(Vec<String>),
    Bytes(Vec<u8>),
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> Self {
        AttributeValue::StrList(v)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(v: Vec<u8>) -> Self {
        AttributeValue::Bytes(v)
    }
}

/// The entity a group of metrics describes.
///
/// An empty resource stands for the host itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Resource {
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Metrics describing one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    #[serde(default)]
    pub resource: Resource,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl ResourceMetrics {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            metrics: Vec::new(),
        }
    }
}

/// Output of one collection cycle.
///
/// Owned by the caller; scrapers only append to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsBatch {
    #[serde(default)]
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl MetricsBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a host-level metric.
    ///
    /// Host metrics share a single resource-less entry, created on first use.
    pub fn push_metric(&mut self, metric: Metric) {
        let idx = match self
            .resource_metrics
            .iter()
            .position(|rm| rm.resource.is_empty())
        {
            Some(idx) => idx,
            None => {
                self.resource_metrics.push(ResourceMetrics::default());
                self.resource_metrics.len() - 1
            }
        };
        self.resource_metrics[idx].metrics.push(metric);
    }

    /// Append metrics for a specific resource (e.g. one process).
    pub fn push_resource(&mut self, resource_metrics: ResourceMetrics) {
        self.resource_metrics.push(resource_metrics);
    }

    /// Iterate over every metric in the batch, across resources.
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.resource_metrics.iter().flat_map(|rm| rm.metrics.iter())
    }

    /// First metric with the given name.
    pub fn find(&self, name: &str) -> Option<&Metric> {
        self.metrics().find(|m| m.name == name)
    }

    pub fn metric_count(&self) -> usize {
        self.metrics().count()
    }

    pub fn data_point_count(&self) -> usize {
        self.metrics().map(|m| m.data_points.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.metric_count() == 0
    }

    /// Move all metrics of `other` into this batch.
    pub fn extend(&mut self, other: MetricsBatch) {
        for rm in other.resource_metrics {
            if rm.resource.is_empty() {
                for metric in rm.metrics {
                    self.push_metric(metric);
                }
            } else {
                self.push_resource(rm);
            }
        }
    }
}
