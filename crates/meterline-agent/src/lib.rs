//! meterline agent library entry.
//!
//! Wires the event recorder, session tracker, snapshot builder, exporter and
//! scheduler into one [`Aggregator`]. Request handlers record through
//! [`EventRecorder`]; the scheduler flushes snapshots to an OTLP/HTTP sink.

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod export;
pub mod host;
pub mod middleware;
pub mod obs;
pub mod recorder;
pub mod router;
pub mod scheduler;
pub mod session;
pub mod snapshot;

pub use aggregator::{Aggregator, FlushOutcome};
pub use recorder::{EventRecorder, RequestTimer};
