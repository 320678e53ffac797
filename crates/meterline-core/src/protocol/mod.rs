//! Wire formats understood by ingestion sinks.
//!
//! Only the OTLP/HTTP JSON shape is implemented: one request per metric,
//! each carrying a single data point.

pub mod otlp;
