//! Counters describing the agent itself (push outcomes, cycle timings).
//!
//! Labels are flattened into sorted key vectors for deterministic ordering;
//! values are plain atomics behind a `DashMap`. Rendered in Prometheus text
//! format for the `/metrics` route.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &[(String, String)]) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum over every series whose labels contain all of `filter`.
    pub fn sum_matching(&self, filter: &[(&str, &str)]) -> u64 {
        self.map
            .iter()
            .filter(|r| {
                filter
                    .iter()
                    .all(|(fk, fv)| r.key().iter().any(|(k, v)| k == fk && v == fv))
            })
            .map(|r| r.value().load(Ordering::Relaxed))
            .sum()
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        let mut rows: Vec<_> = self
            .map
            .iter()
            .map(|r| (label_str(r.key()), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (labels, val) in rows {
            if labels.is_empty() {
                let _ = writeln!(out, "{} {}", name, val);
            } else {
                let _ = writeln!(out, "{}{{{}}} {}", name, labels, val);
            }
        }
    }
}

// Flush-cycle buckets in milliseconds.
const BUCKETS_MILLIS: [u64; 8] = [10, 50, 100, 500, 1_000, 5_000, 10_000, 30_000];

#[derive(Default)]
pub struct DurationHistogram {
    count: AtomicU64,
    sum_ms: AtomicU64,
    buckets: [AtomicU64; 8],
}

impl DurationHistogram {
    pub fn observe(&self, d: Duration) {
        let ms = d.as_millis() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_ms.fetch_add(ms, Ordering::Relaxed);
        for (i, &le) in BUCKETS_MILLIS.iter().enumerate() {
            if ms <= le {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} histogram", name);
        for (i, &le) in BUCKETS_MILLIS.iter().enumerate() {
            let c = self.buckets[i].load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{le=\"{}\"}} {}", name, le, c);
        }
        let count = self.count();
        let _ = writeln!(out, "{}_bucket{{le=\"+Inf\"}} {}", name, count);
        let _ = writeln!(out, "{}_sum {}", name, self.sum_ms.load(Ordering::Relaxed));
        let _ = writeln!(out, "{}_count {}", name, count);
    }
}

/// Outcome label for a successful push.
pub const OUTCOME_OK: &str = "OK";

#[derive(Default)]
pub struct AgentMetrics {
    /// Labels: `metric`, `outcome` (`OK` or an error code).
    pub pushes: CounterVec,
    pub flush_cycles: CounterVec,
    pub skipped_ticks: CounterVec,
    pub flush_duration: DurationHistogram,
}

impl AgentMetrics {
    /// Total failed pushes across all metrics.
    pub fn push_failures(&self) -> u64 {
        let all = self.pushes.sum_matching(&[]);
        all.saturating_sub(self.pushes.sum_matching(&[("outcome", OUTCOME_OK)]))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.pushes.render("meterline_pushes_total", &mut out);
        self.flush_cycles.render("meterline_flush_cycles_total", &mut out);
        self.skipped_ticks.render("meterline_skipped_ticks_total", &mut out);
        self.flush_duration
            .render("meterline_flush_duration_millis", &mut out);
        out
    }
}
