//! Fixtures shared by the agent integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use meterline_agent::clock::ManualClock;
use meterline_agent::config::{self, MeterlineConfig};
use meterline_agent::export::MetricSink;
use meterline_agent::host::{FixedSampler, HostSample};
use meterline_agent::Aggregator;
use meterline_core::protocol::otlp::MetricsRequest;
use meterline_core::Result;

pub const START_MS: u64 = 1_700_000_000_000;

pub fn config_for(url: &str) -> MeterlineConfig {
    let yaml = format!(
        r#"
version: 1
metrics:
  source: "pizza-service"
  url: "{url}"
  api_key: "test-key"
  flush_interval_ms: 10000
  push_timeout_ms: 2000
sessions:
  expiry_ms: 180000
  sweep_interval_ms: 5000
"#
    );
    config::load_from_str(&yaml).expect("test config must parse")
}

pub fn sampler() -> Arc<FixedSampler> {
    Arc::new(FixedSampler(HostSample {
        cpu_ratio: 0.5,
        memory_ratio: 0.25,
    }))
}

/// Accepts everything and keeps a copy.
#[derive(Default)]
pub struct MemorySink {
    pub seen: Mutex<Vec<MetricsRequest>>,
}

impl MemorySink {
    pub fn names(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.first_metric().map(|m| m.name.clone()))
            .collect()
    }

    pub fn count_of(&self, name: &str) -> usize {
        self.names().iter().filter(|n| *n == name).count()
    }
}

#[async_trait]
impl MetricSink for MemorySink {
    async fn push(&self, req: &MetricsRequest) -> Result<()> {
        self.seen.lock().unwrap().push(req.clone());
        Ok(())
    }
}

pub fn memory_aggregator() -> (Arc<ManualClock>, Arc<MemorySink>, Aggregator) {
    let clock = Arc::new(ManualClock::new(START_MS));
    let sink = Arc::new(MemorySink::default());
    let agg = Aggregator::new(
        &config_for("http://127.0.0.1:9"),
        clock.clone(),
        sampler(),
        sink.clone(),
    );
    (clock, sink, agg)
}
