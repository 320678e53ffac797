//! meterline agent binary.
//!
//! Loads `meterline.yaml` (or the path in `METERLINE_CONFIG`), starts the
//! flush scheduler, and serves `/healthz` + `/metrics`. On Ctrl-C the
//! scheduler stops and one last cycle is flushed.

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use meterline_agent::{config, router, Aggregator};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "meterline-agent exited with error");
        std::process::exit(1);
    }
}

async fn run() -> meterline_core::Result<()> {
    let path = std::env::var("METERLINE_CONFIG").unwrap_or_else(|_| "meterline.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.server.listen.parse().map_err(|e| {
        meterline_core::MeterlineError::BadRequest(format!("server.listen must be a valid SocketAddr: {e}"))
    })?;

    let agg = Aggregator::from_config(&cfg)?;
    let scheduler = agg.spawn_scheduler();
    let app = router::build_router(agg.clone());

    tracing::info!(%listen, source = %cfg.metrics.source, "meterline-agent starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| meterline_core::MeterlineError::Internal(format!("failed to bind: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| meterline_core::MeterlineError::Internal(format!("server failed: {e}")))?;

    scheduler.shutdown().await;
    agg.flush_once().await;
    Ok(())
}
