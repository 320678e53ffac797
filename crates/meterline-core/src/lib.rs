//! meterline core: transport-agnostic metric types, wire envelopes, and errors.
//!
//! This crate defines the snapshot model and the OTLP JSON envelope shared by
//! the agent runtime and its sinks. It carries no runtime or network
//! dependencies.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here; fallible paths
//! surface as `MeterlineError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;
pub mod snapshot;

/// Shared result type.
pub use error::{ErrorCode, MeterlineError, Result};
pub use snapshot::{MetricKind, MetricPoint, Snapshot};
