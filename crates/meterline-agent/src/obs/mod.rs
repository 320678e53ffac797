//! In-process metrics about the agent itself.
//!
//! These never leave the process on their own: they are rendered by the
//! `/metrics` route, and the failure total is folded into each export cycle.

pub mod metrics;

pub use metrics::{AgentMetrics, CounterVec, OUTCOME_OK};
