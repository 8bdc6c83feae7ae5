//! Riddle Lock · API server
//!
//! - Axum HTTP API (public listing/check + admin lifecycle)
//! - JSON error envelope for unknown paths and methods
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   RIDDLE_ADMIN_SECRET : shared admin credential
//!   RIDDLE_DATA_PATH    : JSON snapshot of the riddle store
//!   RIDDLE_CONFIG_PATH  : TOML riddle bank for an empty store
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

use riddle_lock::config::Settings;
use riddle_lock::routes::build_router;
use riddle_lock::state::AppState;
use riddle_lock::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let settings = Settings::from_env();

    // Shared application state (riddle store + admin gate).
    let state = Arc::new(AppState::from_settings(&settings).await);

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr).await?;
    info!(target: "riddle_lock", %addr, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "riddle_lock", error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target: "riddle_lock", "Shutdown signal received");
}
