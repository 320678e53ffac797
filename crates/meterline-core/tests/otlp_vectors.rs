//! OTLP JSON envelope vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use meterline_core::protocol::otlp::{MetricData, MetricsRequest, TEMPORALITY_CUMULATIVE};
use meterline_core::snapshot::names;
use meterline_core::MetricPoint;

const SOURCE: &str = "pizza-service";
const T_NANO: u64 = 1_700_000_000_000_000_000;

fn load(name: &str) -> serde_json::Value {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}

#[test]
fn sum_envelope_matches_vector() {
    let point = MetricPoint::sum(names::REQUESTS_PER_METHOD, 3).with_attr("method", "GET");
    let req = MetricsRequest::from_point(&point, SOURCE, T_NANO);

    let encoded: serde_json::Value = serde_json::from_slice(&req.to_json().unwrap()).unwrap();
    assert_eq!(encoded, load("sum_per_method.json"));
}

#[test]
fn gauge_envelope_matches_vector() {
    let point = MetricPoint::gauge(names::CPU_USAGE, 42.5);
    let req = MetricsRequest::from_point(&point, SOURCE, T_NANO);

    let encoded: serde_json::Value = serde_json::to_value(&req).unwrap();
    assert_eq!(encoded, load("gauge_min.json"));
    assert!(encoded.pointer("/resourceMetrics/0/scopeMetrics/0/metrics/0/sum").is_none());
}

#[test]
fn vector_parses_back_into_envelope() {
    let s = fs::read_to_string("tests/vectors/sum_per_method.json").unwrap();
    let req: MetricsRequest = serde_json::from_str(&s).unwrap();

    let metric = req.first_metric().unwrap();
    assert_eq!(metric.name, "requests_per_method");
    match &metric.data {
        MetricData::Sum(sum) => {
            assert_eq!(sum.aggregation_temporality, TEMPORALITY_CUMULATIVE);
            assert!(sum.is_monotonic);
            assert_eq!(sum.data_points[0].as_double, 3.0);
        }
        MetricData::Gauge(_) => panic!("expected sum"),
    }
}

#[test]
fn caller_source_attribute_is_replaced() {
    let point = MetricPoint::sum(names::TOTAL_REQUESTS, 1).with_attr("source", "spoofed");
    let req = MetricsRequest::from_point(&point, SOURCE, T_NANO);

    let attrs = &req.first_metric().unwrap().data.data_points()[0].attributes;
    assert_eq!(attrs.len(), 1);
    assert_eq!(attrs[0].key, "source");
    assert_eq!(attrs[0].value.string_value, SOURCE);
}
