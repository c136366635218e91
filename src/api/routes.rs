//! API Routes
//!
//! Configures the Axum router for the demo server.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clock_handler, health_handler, invalidate_handler, stats_handler, AppState,
};
use crate::config::CacheConfig;
use crate::middleware::CacheLayer;

/// Creates the main router with all endpoints configured.
///
/// Only `/clock` sits behind the cache layer; the operational endpoints are
/// always answered live.
///
/// # Middleware
/// - Cache: `CacheLayer` over the shared store, `/clock` only
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState, config: CacheConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let cached: Router<AppState> = Router::new()
        .route("/clock", get(clock_handler))
        .layer(CacheLayer::new(state.store.clone(), config));

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/admin/cache/*key", delete(invalidate_handler))
        .merge(cached)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
