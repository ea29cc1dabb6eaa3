//! Axum HTTP server for health probes and Prometheus metrics

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;

/// Liveness handler
async fn healthz() -> &'static str {
    "ok"
}

/// Readiness handler
async fn readyz() -> &'static str {
    "ok"
}

/// Metrics endpoint handler
async fn metrics_handler() -> String {
    use prometheus_client::encoding::text::encode;
    let mut buffer = String::new();
    encode(&mut buffer, &crate::controller::metrics::REGISTRY).unwrap();
    buffer
}

/// Serve `/healthz`, `/readyz` and `/metrics` on `addr`.
pub async fn run_server(addr: SocketAddr) -> Result<()> {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http());

    info!("Probe server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
