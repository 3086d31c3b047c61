//! Tsume pool backend
//!
//! - Axum HTTP API for problems and answers
//! - Cron endpoints for replenish and stale deletion
//! - Optional remote generator/solver engine
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   POOL_CONFIG_PATH : path to TOML pool config (defaults used if unset)
//!   ENGINE_BASE_URL  : remote generator/solver; built-in seed bank if absent
//!   BLOB_DIR         : directory for rendered images (in memory if unset)
//!   PUBLIC_BASE_URL  : URL prefix for image links (default "/images")
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use tsume_pool::routes::build_router;
use tsume_pool::state::AppState;
use tsume_pool::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let state = Arc::new(AppState::from_env());
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "tsume_pool", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(target: "tsume_pool", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "tsume_pool", "Shutting down");
}
