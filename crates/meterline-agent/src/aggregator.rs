//! Process-wide metrics aggregator.
//!
//! Owns the recorder, snapshot builder and exporter, built once at startup
//! and shared by cloning. Collaborators record through [`Aggregator::recorder`];
//! the scheduler (or a caller forcing a flush) drives [`Aggregator::flush_once`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use meterline_core::error::Result;
use meterline_core::Snapshot;

use crate::clock::{Clock, SystemClock};
use crate::config::MeterlineConfig;
use crate::export::{ExportReport, Exporter, HttpSink, MetricSink};
use crate::host::{HostSampler, SysinfoSampler};
use crate::obs::AgentMetrics;
use crate::recorder::EventRecorder;
use crate::scheduler::{self, SchedulerHandle};
use crate::snapshot::SnapshotBuilder;

/// What one flush cycle captured and how its pushes went.
#[derive(Debug)]
pub struct FlushOutcome {
    pub snapshot: Snapshot,
    pub report: ExportReport,
}

#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<AggregatorInner>,
}

struct AggregatorInner {
    recorder: Arc<EventRecorder>,
    builder: SnapshotBuilder,
    exporter: Exporter,
    stats: Arc<AgentMetrics>,
    /// Serializes flush cycles.
    cycle: Mutex<()>,
    flush_interval: Duration,
    sweep_interval: Duration,
}

impl Aggregator {
    /// Build with the production collaborators: wall clock, `sysinfo`, HTTP.
    pub fn from_config(cfg: &MeterlineConfig) -> Result<Self> {
        let sink = HttpSink::new(
            cfg.metrics.url.clone(),
            cfg.metrics.api_key.clone(),
            cfg.metrics.push_timeout(),
        )?;
        Ok(Self::new(
            cfg,
            Arc::new(SystemClock),
            Arc::new(SysinfoSampler::new()),
            Arc::new(sink),
        ))
    }

    pub fn new(
        cfg: &MeterlineConfig,
        clock: Arc<dyn Clock>,
        sampler: Arc<dyn HostSampler>,
        sink: Arc<dyn MetricSink>,
    ) -> Self {
        let stats = Arc::new(AgentMetrics::default());
        let recorder = Arc::new(EventRecorder::new(clock, cfg.sessions.expiry()));
        let builder = SnapshotBuilder::new(Arc::clone(&recorder), sampler);
        let exporter = Exporter::new(
            sink,
            cfg.metrics.source.clone(),
            cfg.metrics.push_timeout(),
            Arc::clone(&stats),
        );

        Self {
            inner: Arc::new(AggregatorInner {
                recorder,
                builder,
                exporter,
                stats,
                cycle: Mutex::new(()),
                flush_interval: cfg.metrics.flush_interval(),
                sweep_interval: cfg.sessions.sweep_interval(),
            }),
        }
    }

    pub fn recorder(&self) -> Arc<EventRecorder> {
        Arc::clone(&self.inner.recorder)
    }

    pub fn stats(&self) -> Arc<AgentMetrics> {
        Arc::clone(&self.inner.stats)
    }

    pub fn flush_interval(&self) -> Duration {
        self.inner.flush_interval
    }

    pub fn sweep_interval(&self) -> Duration {
        self.inner.sweep_interval
    }

    /// Run one sweep -> snapshot -> export cycle.
    ///
    /// Concurrent callers queue behind each other; two cycles never build
    /// snapshots at the same time.
    pub async fn flush_once(&self) -> FlushOutcome {
        let _cycle = self.inner.cycle.lock().await;
        let started = tokio::time::Instant::now();

        let snapshot = self.inner.builder.build_and_reset();
        let report = self.inner.exporter.export(&snapshot).await;

        self.inner.stats.flush_cycles.inc(&[]);
        self.inner.stats.flush_duration.observe(started.elapsed());
        tracing::info!(
            sent = report.sent(),
            failed = report.failed(),
            total_requests = snapshot.total_requests,
            active_users = snapshot.active_users,
            "flush cycle complete"
        );

        FlushOutcome { snapshot, report }
    }

    /// Start the periodic flush and sweep tasks.
    pub fn spawn_scheduler(&self) -> SchedulerHandle {
        scheduler::spawn(self.clone())
    }
}
