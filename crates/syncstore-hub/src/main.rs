//! syncstore hub
//!
//! - Loads `syncstore.yaml` (or the path given as the first argument)
//! - Installs the hub on the message bus and starts the listener thread
//! - Serves the WebSocket relay plus health/metrics endpoints

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use syncstore_core::error::{Result, SyncStoreError};
use syncstore_hub::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.client_code().as_str(), "syncstore-hub failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "syncstore.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| SyncStoreError::BadRequest(format!("server.listen must be a valid SocketAddr: {e}")))?;

    let (state, pump) = app_state::AppState::new(cfg)?;
    if !state.is_available() {
        tracing::warn!("storage unavailable; serving announcements only");
    }
    pump.spawn()
        .map_err(|e| SyncStoreError::Internal(format!("listener thread spawn failed: {e}")))?;

    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "syncstore-hub starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| SyncStoreError::Internal(format!("bind failed: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| SyncStoreError::Internal(format!("server failed: {e}")))
}
