//! Capsule Cache - demo server
//!
//! Serves a clock endpoint through the response cache, next to health,
//! statistics and invalidation endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capsule_cache::{api::create_router, AppState, QuotaLru, Settings, Store};

/// Main entry point for the demo server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load settings from environment variables
/// 3. Create the quota-bounded store
/// 4. Create Axum router with the cache layer in front of `/clock`
/// 5. Serve until SIGINT/SIGTERM, then close the store
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capsule_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Capsule Cache demo server");

    let settings = Settings::from_env();
    info!(
        "Settings loaded: ttl={}s, swr={}s, quota={}MB, max_body={}B, port={}",
        settings.ttl_secs,
        settings.swr_secs,
        settings.quota_mb,
        settings.max_body_bytes,
        settings.server_port
    );

    let state = AppState::from_settings(&settings);
    let store = Arc::clone(&state.store);
    info!("Response store initialized");

    let app = create_router(state, settings.cache_config());

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    close_store(&store).await;
    info!("Server shutdown complete");
    Ok(())
}

async fn close_store(store: &QuotaLru) {
    if let Err(err) = store.close().await {
        warn!(error = %err, "failed to close store");
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
