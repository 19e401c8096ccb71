//! Liveness endpoint for external uptime pingers.
//!
//! Always answers 200; it only proves the process is alive. Readiness
//! and single-instance enforcement are the supervisor's job.

use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tracing::{info, warn};

async fn pong() -> &'static str {
    "Pong"
}

pub async fn serve(port: u16) {
    let app = Router::new()
        .route("/", get(pong))
        .route("/healthz", get(pong));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            warn!(%addr, error = %e, "failed to bind liveness endpoint");
            return;
        }
    };

    info!(%addr, "liveness endpoint listening");
    if let Err(e) = axum::serve(listener, app).await {
        warn!(error = %e, "liveness endpoint stopped");
    }
}
