//! Error types for the response cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for store backends.
///
/// The middleware never surfaces these to clients: store failures are logged
/// and the request is served as if caching were disabled.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The store has been closed and no longer accepts operations
    #[error("store is closed")]
    Closed,

    /// Backend-specific failure (remote cache unavailable, serialization, ...)
    #[error("backend error: {0}")]
    Backend(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Backend(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
