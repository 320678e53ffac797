//! Snapshot export: one independent push per metric.
//!
//! Pushes for a cycle run concurrently, each bounded by its own timeout. A
//! failed push is logged and counted, and never stops the others.

mod sink;

pub use sink::{HttpSink, MetricSink};

use std::sync::Arc;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::time::{timeout, Duration};

use meterline_core::error::{MeterlineError, Result};
use meterline_core::protocol::otlp::MetricsRequest;
use meterline_core::snapshot::names;
use meterline_core::{MetricPoint, Snapshot};

use crate::obs::{AgentMetrics, OUTCOME_OK};

/// Result of pushing one point.
#[derive(Debug)]
pub struct PushOutcome {
    pub metric: &'static str,
    pub attributes: Vec<(String, String)>,
    pub result: Result<()>,
}

/// Per-metric results of one export cycle, in completion order.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub outcomes: Vec<PushOutcome>,
}

impl ExportReport {
    pub fn sent(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.sent()
    }

    /// Whether every push for `metric` succeeded (false if none was attempted).
    pub fn is_sent(&self, metric: &str) -> bool {
        let mut any = false;
        for o in self.outcomes.iter().filter(|o| o.metric == metric) {
            if o.result.is_err() {
                return false;
            }
            any = true;
        }
        any
    }

    pub fn attempted(&self, metric: &str) -> bool {
        self.outcomes.iter().any(|o| o.metric == metric)
    }
}

pub struct Exporter {
    sink: Arc<dyn MetricSink>,
    source: String,
    push_timeout: Duration,
    stats: Arc<AgentMetrics>,
}

impl Exporter {
    pub fn new(
        sink: Arc<dyn MetricSink>,
        source: impl Into<String>,
        push_timeout: Duration,
        stats: Arc<AgentMetrics>,
    ) -> Self {
        Self {
            sink,
            source: source.into(),
            push_timeout,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<AgentMetrics> {
        &self.stats
    }

    /// Push every point of `snapshot`, plus the running push-failure total.
    pub async fn export(&self, snapshot: &Snapshot) -> ExportReport {
        let mut points = snapshot.points();
        points.push(MetricPoint::sum(
            names::PUSH_FAILURES,
            self.stats.push_failures(),
        ));

        let time_unix_nano = snapshot.taken_at_ms.saturating_mul(1_000_000);

        let mut futs = FuturesUnordered::new();
        for point in points {
            futs.push(self.push_one(point, time_unix_nano));
        }

        let mut report = ExportReport::default();
        while let Some(outcome) = futs.next().await {
            self.observe(&outcome);
            report.outcomes.push(outcome);
        }
        report
    }

    async fn push_one(&self, point: MetricPoint, time_unix_nano: u64) -> PushOutcome {
        let req = MetricsRequest::from_point(&point, &self.source, time_unix_nano);
        let result = match timeout(self.push_timeout, self.sink.push(&req)).await {
            Ok(r) => r,
            Err(_) => Err(MeterlineError::Timeout),
        };
        PushOutcome {
            metric: point.name,
            attributes: point.attributes,
            result,
        }
    }

    fn observe(&self, o: &PushOutcome) {
        match &o.result {
            Ok(()) => {
                self.stats
                    .pushes
                    .inc(&[("metric", o.metric), ("outcome", OUTCOME_OK)]);
                tracing::debug!(metric = o.metric, "pushed metric");
            }
            Err(e) => {
                self.stats
                    .pushes
                    .inc(&[("metric", o.metric), ("outcome", e.code().as_str())]);
                tracing::warn!(metric = o.metric, error = %e, "failed to push metric");
            }
        }
    }
}
