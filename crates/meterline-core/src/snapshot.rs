//! Immutable per-cycle view of all metrics, and its flattening into points.

use std::collections::BTreeMap;

/// Exported metric names, as the existing dashboards query them.
pub mod names {
    pub const CPU_USAGE: &str = "cpu_usage";
    pub const MEMORY_USAGE: &str = "memory_usage";
    pub const ACTIVE_USERS: &str = "activeUsers";
    pub const ITEMS_SOLD: &str = "numPizzasSold";
    pub const ITEM_CREATION_FAILURES: &str = "createPizzaFailures";
    pub const TOTAL_REVENUE: &str = "totalRevenue";
    pub const SUCCESSFUL_AUTHS: &str = "successfulAuths";
    pub const FAILED_AUTHS: &str = "failedAuths";
    pub const TOTAL_REQUESTS: &str = "numRequests";
    pub const REQUESTS_PER_METHOD: &str = "requests_per_method";
    pub const REQUEST_LATENCY: &str = "latency";
    pub const OPERATION_LATENCY: &str = "pizzaLatency";
    pub const PUSH_FAILURES: &str = "metrics_push_failures";
}

/// How the sink must aggregate a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic total with cumulative temporality.
    CumulativeSum,
    /// Point-in-time value.
    Gauge,
}

/// One value to push, before wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub name: &'static str,
    pub kind: MetricKind,
    pub value: f64,
    /// Caller-supplied attributes; `source` is added at encode time.
    pub attributes: Vec<(String, String)>,
}

impl MetricPoint {
    pub fn sum(name: &'static str, value: u64) -> Self {
        Self {
            name,
            kind: MetricKind::CumulativeSum,
            value: value as f64,
            attributes: Vec::new(),
        }
    }

    pub fn gauge(name: &'static str, value: f64) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            value,
            attributes: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }
}

/// Materialized view of all metrics at one instant.
///
/// Cumulative fields are totals since process start. The latency averages
/// cover only the interval since the previous snapshot and are `None` when
/// that interval saw no samples.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Capture time, milliseconds since the Unix epoch.
    pub taken_at_ms: u64,

    pub total_requests: u64,
    pub successful_auths: u64,
    pub failed_auths: u64,
    pub items_sold: u64,
    pub item_creation_failures: u64,
    pub revenue: f64,
    pub requests_per_method: BTreeMap<String, u64>,

    pub active_users: u64,

    pub avg_request_latency_ms: Option<f64>,
    pub avg_operation_latency_ms: Option<f64>,

    /// Host load ratio (1.0 = every core busy).
    pub cpu_ratio: f64,
    /// Used / total memory.
    pub memory_ratio: f64,
}

impl Snapshot {
    /// Flatten into the points pushed for one cycle.
    ///
    /// Empty-interval averages produce no point at all.
    pub fn points(&self) -> Vec<MetricPoint> {
        let mut out = Vec::with_capacity(12 + self.requests_per_method.len());

        out.push(MetricPoint::gauge(names::CPU_USAGE, percent(self.cpu_ratio)));
        out.push(MetricPoint::gauge(names::MEMORY_USAGE, percent(self.memory_ratio)));
        // Drops on logout and expiry, so a gauge: a decreasing monotonic sum
        // reads as a counter reset downstream.
        out.push(MetricPoint::gauge(names::ACTIVE_USERS, self.active_users as f64));

        out.push(MetricPoint::sum(names::ITEMS_SOLD, self.items_sold));
        out.push(MetricPoint::sum(
            names::ITEM_CREATION_FAILURES,
            self.item_creation_failures,
        ));
        out.push(MetricPoint::gauge(names::TOTAL_REVENUE, self.revenue));

        out.push(MetricPoint::sum(names::SUCCESSFUL_AUTHS, self.successful_auths));
        out.push(MetricPoint::sum(names::FAILED_AUTHS, self.failed_auths));

        out.push(MetricPoint::sum(names::TOTAL_REQUESTS, self.total_requests));
        for (method, count) in &self.requests_per_method {
            out.push(
                MetricPoint::sum(names::REQUESTS_PER_METHOD, *count).with_attr("method", method),
            );
        }

        if let Some(avg) = self.avg_request_latency_ms {
            out.push(MetricPoint::gauge(names::REQUEST_LATENCY, avg));
        }
        if let Some(avg) = self.avg_operation_latency_ms {
            out.push(MetricPoint::gauge(names::OPERATION_LATENCY, avg));
        }

        out
    }
}

fn percent(ratio: f64) -> f64 {
    if ratio.is_finite() {
        (ratio * 100.0).max(0.0)
    } else {
        0.0
    }
}
