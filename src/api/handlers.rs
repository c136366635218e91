//! API Handlers
//!
//! HTTP request handlers for each demo server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::cache::{QuotaLru, Store};
use crate::config::Settings;
use crate::error::Result;
use crate::models::{ClockResponse, HealthResponse, InvalidateResponse, StatsResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store shared with the cache layer
    pub store: Arc<QuotaLru>,
}

impl AppState {
    pub fn new(store: Arc<QuotaLru>) -> Self {
        Self { store }
    }

    /// Creates a new AppState with a store sized from the settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(Arc::new(QuotaLru::with_megabytes(settings.quota_mb)))
    }
}

/// Handler for GET /clock
///
/// Deliberately uncached on its own: the router puts it behind the cache layer.
pub async fn clock_handler() -> Json<ClockResponse> {
    Json(ClockResponse::now())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
///
/// Returns current store statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.store.stats().await.into())
}

/// Handler for DELETE /admin/cache/*key
///
/// Removing an absent key succeeds.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    state.store.delete(&key).await?;
    info!(cache_key = %key, "cache key invalidated");

    Ok(Json(InvalidateResponse::new(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseEntry;
    use crate::error::CacheError;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use bytes::Bytes;
    use std::time::Duration;

    fn test_state() -> AppState {
        AppState::new(Arc::new(QuotaLru::new(64 * 1024)))
    }

    fn entry() -> Arc<ResponseEntry> {
        Arc::new(ResponseEntry::new(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"cached"),
            Duration::from_secs(60),
            Duration::from_secs(60),
        ))
    }

    #[tokio::test]
    async fn test_invalidate_handler_removes_key() {
        let state = test_state();
        state.store.set("cache:GET:/clock", entry()).await.unwrap();

        let response = invalidate_handler(
            State(state.clone()),
            Path("cache:GET:/clock".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(response.key, "cache:GET:/clock");
        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_absent_key_succeeds() {
        let state = test_state();

        let result = invalidate_handler(State(state), Path("missing".to_string())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        state.store.set("k", entry()).await.unwrap();
        state.store.get("k").await.unwrap();
        state.store.get("other").await.unwrap();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 1);
        assert_eq!(response.misses, 1);
        assert_eq!(response.total_entries, 1);
        assert_eq!(response.max_bytes, 64 * 1024);
    }

    #[tokio::test]
    async fn test_closed_store_surfaces_as_error_response() {
        let state = test_state();
        state.store.close().await.unwrap();

        // Deleting on a closed store is a no-op, but reads now fail
        let result = invalidate_handler(State(state.clone()), Path("k".to_string())).await;
        assert!(result.is_ok());

        let err = state.store.get("k").await.unwrap_err();
        assert!(matches!(err, CacheError::Closed));
        assert_eq!(
            err.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_clock_handler() {
        let response = clock_handler().await;
        assert!(response.unix_ms > 0);
    }
}
