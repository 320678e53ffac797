//! Axum router for the agent's own HTTP surface.
//!
//! Exposes `/healthz` and `/metrics` (agent self-metrics in Prometheus text),
//! both counted by the request middleware.

use axum::{extract::State, middleware, routing::get, Router};

use crate::aggregator::Aggregator;
use crate::middleware::track_requests;

pub fn build_router(agg: Aggregator) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(render_metrics))
        .layer(middleware::from_fn_with_state(agg.recorder(), track_requests))
        .with_state(agg)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn render_metrics(State(agg): State<Aggregator>) -> String {
    agg.stats().render()
}
