use std::sync::Arc;

use meterline_core::Snapshot;

use crate::host::HostSampler;
use crate::recorder::EventRecorder;

/// Turns live recorder state into a [`Snapshot`] and opens the next interval.
pub struct SnapshotBuilder {
    recorder: Arc<EventRecorder>,
    sampler: Arc<dyn HostSampler>,
}

impl SnapshotBuilder {
    pub fn new(recorder: Arc<EventRecorder>, sampler: Arc<dyn HostSampler>) -> Self {
        Self { recorder, sampler }
    }

    /// Sweep, read, sample, reset.
    ///
    /// The interval accumulators are taken in one locked swap, so a latency
    /// sample recorded concurrently lands either in this snapshot or in the
    /// next one, never both and never neither. Cumulative totals are read
    /// without reset, and the request total never trails the per-method
    /// counts read alongside it.
    pub fn build_and_reset(&self) -> Snapshot {
        let evicted = self.recorder.sweep_expired_users();
        if evicted > 0 {
            tracing::debug!(evicted, "swept expired users before snapshot");
        }

        let mut snap = Snapshot {
            taken_at_ms: self.recorder.now_ms(),
            active_users: self.recorder.sessions().len() as u64,
            ..Default::default()
        };
        self.recorder.read_cumulative(&mut snap);

        let window = self.recorder.take_interval();
        snap.avg_request_latency_ms = window.avg_request_latency_ms();
        snap.avg_operation_latency_ms = window.avg_operation_latency_ms();

        let host = self.sampler.sample();
        snap.cpu_ratio = host.cpu_ratio;
        snap.memory_ratio = host.memory_ratio;

        snap
    }
}
