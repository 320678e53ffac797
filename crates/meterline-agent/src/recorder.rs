//! Event recording surface, called from request handlers.
//!
//! Every operation is a short in-memory mutation: atomics for cumulative
//! totals, a sharded map for per-method counts, and one small mutex around
//! the interval accumulators. Nothing here performs I/O or returns an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;

use meterline_core::Snapshot;

use crate::clock::Clock;
use crate::session::SessionTracker;

/// Cumulative totals. Never reset.
#[derive(Default)]
struct Totals {
    requests: AtomicU64,
    successful_auths: AtomicU64,
    failed_auths: AtomicU64,
    items_sold: AtomicU64,
    item_creation_failures: AtomicU64,
    /// `f64` bit pattern.
    revenue_bits: AtomicU64,
}

/// Accumulators scoped to one flush interval.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IntervalWindow {
    pub latency_sum_ms: u64,
    pub latency_samples: u64,
    pub operation_sum_ms: u64,
    pub operation_attempts: u64,
}

impl IntervalWindow {
    pub fn avg_request_latency_ms(&self) -> Option<f64> {
        average(self.latency_sum_ms, self.latency_samples)
    }

    pub fn avg_operation_latency_ms(&self) -> Option<f64> {
        average(self.operation_sum_ms, self.operation_attempts)
    }
}

fn average(sum: u64, count: u64) -> Option<f64> {
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

pub struct EventRecorder {
    clock: Arc<dyn Clock>,
    totals: Totals,
    methods: DashMap<String, AtomicU64>,
    interval: Mutex<IntervalWindow>,
    sessions: SessionTracker,
}

impl EventRecorder {
    pub fn new(clock: Arc<dyn Clock>, session_expiry: Duration) -> Self {
        Self {
            clock,
            totals: Totals::default(),
            methods: DashMap::new(),
            interval: Mutex::new(IntervalWindow::default()),
            sessions: SessionTracker::new(session_expiry),
        }
    }

    /// Current time from the injected clock, for callers timing operations.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn record_request(&self, method: &str) {
        // Total first, method second: readers go the other way round, so a
        // snapshot never shows more per-method requests than total requests.
        self.totals.requests.fetch_add(1, Ordering::Relaxed);
        if let Some(c) = self.methods.get(method) {
            c.fetch_add(1, Ordering::Release);
            return;
        }
        self.methods
            .entry(method.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Release);
    }

    /// Count the request and start its latency timer.
    ///
    /// The returned guard records `now - start` when dropped, so the sample
    /// lands exactly once whether the request completes, fails or is
    /// abandoned.
    pub fn begin_request(self: &Arc<Self>, method: &str) -> RequestTimer {
        self.record_request(method);
        RequestTimer {
            recorder: Arc::clone(self),
            start_ms: self.now_ms(),
        }
    }

    /// Add `now - start_ms` to the interval request-latency sum.
    pub fn track_request_latency(&self, start_ms: u64) {
        let elapsed = self.now_ms().saturating_sub(start_ms);
        let mut w = self.lock_interval();
        w.latency_sum_ms = w.latency_sum_ms.saturating_add(elapsed);
        w.latency_samples += 1;
    }

    /// Add `end_ms - start_ms` for one attempt of the tracked operation.
    pub fn track_operation_latency(&self, start_ms: u64, end_ms: u64) {
        let Some(elapsed) = end_ms.checked_sub(start_ms) else {
            tracing::warn!(start_ms, end_ms, "operation latency ignored: end before start");
            return;
        };
        let mut w = self.lock_interval();
        w.operation_sum_ms = w.operation_sum_ms.saturating_add(elapsed);
        w.operation_attempts += 1;
    }

    pub fn record_auth_result(&self, success: bool) {
        let c = if success {
            &self.totals.successful_auths
        } else {
            &self.totals.failed_auths
        };
        c.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sale_outcome(&self, success: bool) {
        let c = if success {
            &self.totals.items_sold
        } else {
            &self.totals.item_creation_failures
        };
        c.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to cumulative revenue. Negative or non-finite amounts are dropped.
    pub fn record_revenue(&self, amount: f64) {
        if !amount.is_finite() || amount < 0.0 {
            tracing::warn!(amount, "revenue ignored: must be a finite non-negative amount");
            return;
        }
        let _ = self
            .totals
            .revenue_bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + amount).to_bits())
            });
    }

    pub fn mark_user_active(&self, user_id: &str) {
        self.sessions.mark_active(user_id, self.now_ms());
    }

    pub fn mark_user_inactive(&self, user_id: &str) {
        self.sessions.mark_inactive(user_id);
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Drop expired users as of the injected clock's "now".
    pub fn sweep_expired_users(&self) -> usize {
        self.sessions.sweep_expired(self.now_ms())
    }

    pub fn total_requests(&self) -> u64 {
        self.totals.requests.load(Ordering::Relaxed)
    }

    pub fn method_count(&self, method: &str) -> u64 {
        self.methods
            .get(method)
            .map(|c| c.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    pub fn revenue(&self) -> f64 {
        f64::from_bits(self.totals.revenue_bits.load(Ordering::Acquire))
    }

    /// Copy cumulative totals and per-method counts into `snap`.
    ///
    /// Per-method counts are read before the request total, so
    /// `total_requests >= sum(requests_per_method)` holds under concurrent
    /// recording.
    pub(crate) fn read_cumulative(&self, snap: &mut Snapshot) {
        let t = &self.totals;
        snap.requests_per_method = self
            .methods
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::Acquire)))
            .collect();
        snap.total_requests = t.requests.load(Ordering::Relaxed);
        snap.successful_auths = t.successful_auths.load(Ordering::Relaxed);
        snap.failed_auths = t.failed_auths.load(Ordering::Relaxed);
        snap.items_sold = t.items_sold.load(Ordering::Relaxed);
        snap.item_creation_failures = t.item_creation_failures.load(Ordering::Relaxed);
        snap.revenue = self.revenue();
    }

    /// Take the interval accumulators, leaving zeros behind.
    pub(crate) fn take_interval(&self) -> IntervalWindow {
        std::mem::take(&mut *self.lock_interval())
    }

    #[cfg(test)]
    pub(crate) fn peek_interval(&self) -> IntervalWindow {
        *self.lock_interval()
    }

    fn lock_interval(&self) -> std::sync::MutexGuard<'_, IntervalWindow> {
        // Holders never panic mid-update; a poisoned window is still consistent.
        self.interval.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Completion hook returned by [`EventRecorder::begin_request`].
#[must_use = "dropping the timer immediately records a zero-length request"]
pub struct RequestTimer {
    recorder: Arc<EventRecorder>,
    start_ms: u64,
}

impl RequestTimer {
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.recorder.track_request_latency(self.start_ms);
    }
}
