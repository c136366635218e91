//! Response DTOs for the demo server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the cached clock endpoint (GET /clock)
///
/// Served through the cache, so `now` only advances when the entry is
/// recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct ClockResponse {
    /// Generation time in RFC 3339 format
    pub now: String,
    /// Generation time in milliseconds since the Unix epoch
    pub unix_ms: i64,
}

impl ClockResponse {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            now: time.to_rfc3339(),
            unix_ms: time.timestamp_millis(),
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }
}

/// Response body for the admin invalidation endpoint (DELETE /admin/cache/*key)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// Success message
    pub message: String,
    /// The key that was invalidated
    pub key: String,
}

impl InvalidateResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' invalidated", key),
            key,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of lookups that returned an entry
    pub hits: u64,
    /// Number of lookups that found nothing
    pub misses: u64,
    /// Number of entries evicted by the quota
    pub evictions: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Bytes currently accounted to stored entries
    pub total_bytes: usize,
    /// Configured byte quota
    pub max_bytes: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
            total_bytes: stats.total_bytes,
            max_bytes: stats.max_bytes,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body, mirrors the JSON produced by `CacheError`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
