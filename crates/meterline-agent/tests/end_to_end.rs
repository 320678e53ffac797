//! Record -> flush -> OTLP/HTTP push, against a mock ingestion endpoint.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use std::sync::Arc;
use std::time::Duration;

use meterline_agent::clock::ManualClock;
use meterline_agent::export::HttpSink;
use meterline_agent::Aggregator;
use meterline_core::snapshot::names;
use serde_json::Value;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{config_for, sampler, START_MS};

async fn http_aggregator(server: &MockServer) -> (Arc<ManualClock>, Aggregator) {
    let url = format!("{}/otlp/v1/metrics", server.uri());
    let cfg = config_for(&url);
    let clock = Arc::new(ManualClock::new(START_MS));
    let sink = HttpSink::new(url, "test-key", cfg.metrics.push_timeout()).unwrap();
    let agg = Aggregator::new(&cfg, clock.clone(), sampler(), Arc::new(sink));
    (clock, agg)
}

async fn received_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn metric_name(body: &Value) -> &str {
    body.pointer("/resourceMetrics/0/scopeMetrics/0/metrics/0/name")
        .and_then(Value::as_str)
        .unwrap()
}

#[tokio::test]
async fn requests_by_method_reach_the_sink() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/otlp/v1/metrics"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (_, agg) = http_aggregator(&server).await;
    let rec = agg.recorder();
    for m in ["GET", "GET", "GET", "POST"] {
        rec.record_request(m);
    }

    let out = agg.flush_once().await;
    assert_eq!(out.snapshot.total_requests, 4);
    assert_eq!(out.snapshot.requests_per_method.get("GET"), Some(&3));
    assert_eq!(out.snapshot.requests_per_method.get("POST"), Some(&1));
    assert_eq!(out.report.failed(), 0);

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), out.report.outcomes.len());

    let total = bodies
        .iter()
        .find(|b| metric_name(b) == names::TOTAL_REQUESTS)
        .unwrap();
    let sum = total
        .pointer("/resourceMetrics/0/scopeMetrics/0/metrics/0/sum")
        .unwrap();
    assert_eq!(sum["dataPoints"][0]["asDouble"], 4.0);
    assert_eq!(sum["aggregationTemporality"], "AGGREGATION_TEMPORALITY_CUMULATIVE");
    assert_eq!(sum["isMonotonic"], true);
    assert_eq!(
        sum["dataPoints"][0]["timeUnixNano"].as_u64(),
        Some(START_MS * 1_000_000)
    );

    let mut per_method: Vec<(String, f64)> = bodies
        .iter()
        .filter(|b| metric_name(b) == names::REQUESTS_PER_METHOD)
        .map(|b| {
            let dp = b
                .pointer("/resourceMetrics/0/scopeMetrics/0/metrics/0/sum/dataPoints/0")
                .unwrap();
            let attrs = dp["attributes"].as_array().unwrap();
            let method = attrs
                .iter()
                .find(|kv| kv["key"] == "method")
                .and_then(|kv| kv["value"]["stringValue"].as_str())
                .unwrap()
                .to_string();
            assert!(attrs
                .iter()
                .any(|kv| kv["key"] == "source" && kv["value"]["stringValue"] == "pizza-service"));
            (method, dp["asDouble"].as_f64().unwrap())
        })
        .collect();
    per_method.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(per_method, vec![("GET".to_string(), 3.0), ("POST".to_string(), 1.0)]);

    let cpu = bodies.iter().find(|b| metric_name(b) == names::CPU_USAGE).unwrap();
    let gauge = cpu
        .pointer("/resourceMetrics/0/scopeMetrics/0/metrics/0/gauge/dataPoints/0/asDouble")
        .unwrap();
    assert_eq!(gauge.as_f64(), Some(50.0));

    let users = bodies
        .iter()
        .find(|b| metric_name(b) == names::ACTIVE_USERS)
        .unwrap();
    assert!(users
        .pointer("/resourceMetrics/0/scopeMetrics/0/metrics/0/gauge")
        .is_some());
    assert!(users
        .pointer("/resourceMetrics/0/scopeMetrics/0/metrics/0/sum")
        .is_none());
}

#[tokio::test]
async fn rejected_metric_does_not_stop_the_rest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("\"name\":\"failedAuths\""))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (_, agg) = http_aggregator(&server).await;
    agg.recorder().record_auth_result(false);
    agg.recorder().record_auth_result(true);

    let out = agg.flush_once().await;
    assert!(!out.report.is_sent(names::FAILED_AUTHS));
    assert!(out.report.is_sent(names::SUCCESSFUL_AUTHS));
    assert_eq!(out.report.failed(), 1);
    assert_eq!(out.snapshot.failed_auths, 1, "captured data survives the failure");

    assert_eq!(agg.stats().push_failures(), 1);
    assert_eq!(
        agg.stats()
            .pushes
            .get(&[("metric", names::FAILED_AUTHS), ("outcome", "STATUS")]),
        1
    );
}

#[tokio::test]
async fn slow_sink_times_out_per_push() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let (_, agg) = http_aggregator(&server).await;
    let started = std::time::Instant::now();
    let out = agg.flush_once().await;

    assert_eq!(out.report.sent(), 0);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn unreachable_sink_is_logged_not_raised() {
    // Nothing listens on the discard port.
    let cfg = config_for("http://127.0.0.1:9/v1/metrics");
    let sink = HttpSink::new(cfg.metrics.url.clone(), "k", cfg.metrics.push_timeout()).unwrap();
    let agg = Aggregator::new(
        &cfg,
        Arc::new(ManualClock::new(START_MS)),
        sampler(),
        Arc::new(sink),
    );
    agg.recorder().record_request("GET");

    let out = agg.flush_once().await;
    assert_eq!(out.report.sent(), 0);
    assert_eq!(out.snapshot.total_requests, 1);

    let again = agg.flush_once().await;
    assert_eq!(again.snapshot.total_requests, 1);
}

#[tokio::test]
async fn latency_average_then_omitted_after_reset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (clock, agg) = http_aggregator(&server).await;
    let rec = agg.recorder();
    for ms in [5, 15, 10] {
        let timer = rec.begin_request("GET");
        clock.advance(Duration::from_millis(ms));
        drop(timer);
    }

    let first = agg.flush_once().await;
    assert_eq!(first.snapshot.avg_request_latency_ms, Some(10.0));
    assert!(first.report.is_sent(names::REQUEST_LATENCY));

    let second = agg.flush_once().await;
    assert_eq!(second.snapshot.avg_request_latency_ms, None);
    assert!(!second.report.attempted(names::REQUEST_LATENCY));
    assert!(!second.report.attempted(names::OPERATION_LATENCY));
}
