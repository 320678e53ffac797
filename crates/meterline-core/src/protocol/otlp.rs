//! OTLP/HTTP JSON envelope, one metric per request.
//!
//! Field names follow the OTLP JSON mapping (camelCase). `timeUnixNano` is
//! emitted as a JSON number.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::snapshot::{MetricKind, MetricPoint};

pub const TEMPORALITY_CUMULATIVE: &str = "AGGREGATION_TEMPORALITY_CUMULATIVE";

/// Attribute key identifying the emitting service.
pub const SOURCE_ATTR: &str = "source";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRequest {
    pub resource_metrics: Vec<ResourceMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    pub scope_metrics: Vec<ScopeMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeMetrics {
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub unit: String,
    /// Serialized as either a `sum` or a `gauge` key.
    #[serde(flatten)]
    pub data: MetricData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricData {
    Sum(Sum),
    Gauge(Gauge),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sum {
    pub data_points: Vec<DataPoint>,
    pub aggregation_temporality: String,
    pub is_monotonic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gauge {
    pub data_points: Vec<DataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub as_double: f64,
    pub time_unix_nano: u64,
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: AnyValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyValue {
    pub string_value: String,
}

impl MetricsRequest {
    /// Wrap a single point in the full envelope.
    ///
    /// Caller attributes keep their order; `source` is appended last and
    /// replaces any caller-supplied `source`.
    pub fn from_point(point: &MetricPoint, source: &str, time_unix_nano: u64) -> Self {
        let mut attributes: Vec<KeyValue> = point
            .attributes
            .iter()
            .filter(|(k, _)| k != SOURCE_ATTR)
            .map(|(k, v)| KeyValue::string(k, v))
            .collect();
        attributes.push(KeyValue::string(SOURCE_ATTR, source));

        let data_points = vec![DataPoint {
            as_double: point.value,
            time_unix_nano,
            attributes,
        }];

        let data = match point.kind {
            MetricKind::CumulativeSum => MetricData::Sum(Sum {
                data_points,
                aggregation_temporality: TEMPORALITY_CUMULATIVE.to_string(),
                is_monotonic: true,
            }),
            MetricKind::Gauge => MetricData::Gauge(Gauge { data_points }),
        };

        Self {
            resource_metrics: vec![ResourceMetrics {
                scope_metrics: vec![ScopeMetrics {
                    metrics: vec![Metric {
                        name: point.name.to_string(),
                        unit: "1".to_string(),
                        data,
                    }],
                }],
            }],
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The single metric carried by envelopes built with `from_point`.
    pub fn first_metric(&self) -> Option<&Metric> {
        self.resource_metrics
            .first()?
            .scope_metrics
            .first()?
            .metrics
            .first()
    }
}

impl KeyValue {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: AnyValue {
                string_value: value.into(),
            },
        }
    }
}

impl MetricData {
    pub fn data_points(&self) -> &[DataPoint] {
        match self {
            MetricData::Sum(s) => &s.data_points,
            MetricData::Gauge(g) => &g.data_points,
        }
    }
}
