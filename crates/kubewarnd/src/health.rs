//! Liveness endpoint.
//!
//! A minimal axum server exposing `GET /healthz`, enough for a kubelet
//! liveness probe. The daemon has no readiness distinction: if the process
//! is up, the relay loop is running.

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// Builds the liveness router.
pub fn router() -> Router {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Binds and serves the liveness endpoint until a fatal error.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "liveness endpoint listening");

    axum::serve(listener, router()).await?;
    Ok(())
}
