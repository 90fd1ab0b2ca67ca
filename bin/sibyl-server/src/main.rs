// SPDX-License-Identifier: AGPL-3.0-only
// Minimal bootstrap; handlers live in the routes module.
use anyhow::Result;
use std::net::SocketAddr;
use tracing::{info, warn};

mod routes;
mod summary;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    info!("sibyl-server starting");
    // a missing credential is a deployment mistake, not a per-request condition
    sibyl::shared_client().map_err(|e| anyhow::anyhow!("model client init failed: {e}"))?;

    let app = routes::build_router();
    let addr: SocketAddr = std::env::var("SIBYL_HTTP_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8000".into())
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid SIBYL_HTTP_ADDR: {e}"))?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            warn!(error=%e, %addr, "bind failed, using ephemeral");
            tokio::net::TcpListener::bind("127.0.0.1:0").await?
        }
    };
    let local = listener.local_addr()?;
    info!(%local, "listening");

    tokio::select! { _ = axum::serve(listener, app) => {} _ = tokio::signal::ctrl_c() => {} }
    info!("sibyl-server shutting down");
    Ok(())
}
