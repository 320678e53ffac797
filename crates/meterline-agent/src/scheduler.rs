//! Periodic drivers: one task flushes, one task sweeps expired users.
//!
//! The flush task awaits each cycle before waiting for the next tick, so
//! cycles are serialized. Ticks missed while a slow cycle was exporting are
//! skipped, not replayed.

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::aggregator::Aggregator;

/// Handle to the running tasks. Dropping it leaves them running.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    flush: JoinHandle<()>,
    sweep: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop both tasks and wait for them. An in-flight cycle finishes first.
    ///
    /// A task that panicked is reported here rather than silently dropped.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.flush.await {
            tracing::warn!(task = "flush", error = %e, "scheduler task ended abnormally");
        }
        if let Err(e) = self.sweep.await {
            tracing::warn!(task = "sweep", error = %e, "scheduler task ended abnormally");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.flush.is_finished() || !self.sweep.is_finished()
    }
}

pub(crate) fn spawn(agg: Aggregator) -> SchedulerHandle {
    let cancel = CancellationToken::new();

    let flush = {
        let agg = agg.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let period = agg.flush_interval();
            let mut tick = interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(period_ms = period.as_millis() as u64, "flush scheduler started");
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        let started = Instant::now();
                        agg.flush_once().await;

                        let missed = (started.elapsed().as_millis() / period.as_millis().max(1)) as u64;
                        if missed > 0 {
                            agg.stats().skipped_ticks.add(&[], missed);
                            tracing::warn!(missed, "flush cycle overran its period; ticks skipped");
                        }
                    }
                }
            }
            tracing::info!("flush scheduler stopped");
        })
    };

    let sweep = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let period = agg.sweep_interval();
            let mut tick = interval_at(Instant::now() + period, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let recorder = agg.recorder();
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        let evicted = recorder.sweep_expired_users();
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining = recorder.sessions().len(), "session sweep");
                        }
                    }
                }
            }
        })
    };

    SchedulerHandle {
        cancel,
        flush,
        sweep,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_survives_a_panicked_task() {
        let handle = SchedulerHandle {
            cancel: CancellationToken::new(),
            flush: tokio::spawn(async { panic!("flush cycle blew up") }),
            sweep: tokio::spawn(async {}),
        };
        tokio::task::yield_now().await;

        handle.shutdown().await;
    }
}
