//! Configuration Module
//!
//! Middleware settings and the environment-driven settings of the demo server.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};

use crate::headers::strip_hop_by_hop;
use crate::keys::{default_key, KeyFn};

/// Decides whether a response status may be stored.
pub type AdmissionFn = Arc<dyn Fn(StatusCode) -> bool + Send + Sync>;

/// Produces the header set that gets stored for a response.
pub type HeaderFilterFn = Arc<dyn Fn(&HeaderMap) -> HeaderMap + Send + Sync>;

/// Default cap on cacheable body size (1 MB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default cap on request bodies buffered by the cache layer (2 MB, as axum)
pub const DEFAULT_MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

// == Cache Config ==
/// Behaviour of the caching middleware.
#[derive(Clone)]
pub struct CacheConfig {
    /// How long a new entry stays fresh
    pub default_ttl: Duration,
    /// Stale-while-revalidate window following the TTL
    pub default_swr: Duration,
    /// Request to key mapping; an empty key bypasses the cache
    pub key_fn: KeyFn,
    /// Admission predicate over response status codes
    pub should_cache: AdmissionFn,
    /// Largest cacheable body in bytes, 0 disables the cap
    pub max_body_bytes: usize,
    /// Header filter applied before storing
    pub strip_headers: HeaderFilterFn,
    /// Largest request body the cache layer buffers for a cacheable request
    pub max_request_body_bytes: usize,
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_swr(mut self, swr: Duration) -> Self {
        self.default_swr = swr;
        self
    }

    pub fn with_key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&axum::http::Request<bytes::Bytes>) -> String + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(key_fn);
        self
    }

    pub fn with_admission<F>(mut self, should_cache: F) -> Self
    where
        F: Fn(StatusCode) -> bool + Send + Sync + 'static,
    {
        self.should_cache = Arc::new(should_cache);
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn with_max_request_body_bytes(mut self, max_request_body_bytes: usize) -> Self {
        self.max_request_body_bytes = max_request_body_bytes;
        self
    }

    pub fn with_header_filter<F>(mut self, strip_headers: F) -> Self
    where
        F: Fn(&HeaderMap) -> HeaderMap + Send + Sync + 'static,
    {
        self.strip_headers = Arc::new(strip_headers);
        self
    }

    /// Cap handed to recorders; `None` when caching size is unbounded.
    pub fn body_cap(&self) -> Option<usize> {
        (self.max_body_bytes > 0).then_some(self.max_body_bytes)
    }
}

impl Default for CacheConfig {
    /// Five minutes fresh, one minute stale, 2xx only, 1 MB bodies.
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            default_swr: Duration::from_secs(60),
            key_fn: Arc::new(default_key),
            should_cache: Arc::new(|status: StatusCode| status.is_success()),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            strip_headers: Arc::new(strip_hop_by_hop),
            max_request_body_bytes: DEFAULT_MAX_REQUEST_BODY_BYTES,
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("default_ttl", &self.default_ttl)
            .field("default_swr", &self.default_swr)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("max_request_body_bytes", &self.max_request_body_bytes)
            .finish_non_exhaustive()
    }
}

// == Server Settings ==
/// Demo server parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Fresh window in seconds
    pub ttl_secs: u64,
    /// Stale-while-revalidate window in seconds
    pub swr_secs: u64,
    /// Store quota in megabytes
    pub quota_mb: usize,
    /// Largest cacheable body in bytes, 0 disables the cap
    pub max_body_bytes: usize,
    /// HTTP server port
    pub server_port: u16,
}

impl Settings {
    /// Creates Settings by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_SECS` - Fresh window (default: 300)
    /// - `CACHE_SWR_SECS` - Stale-while-revalidate window (default: 60)
    /// - `CACHE_QUOTA_MB` - Store quota in MB (default: 64)
    /// - `CACHE_MAX_BODY_BYTES` - Cacheable body cap (default: 1048576)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_secs: env_or("CACHE_TTL_SECS", defaults.ttl_secs),
            swr_secs: env_or("CACHE_SWR_SECS", defaults.swr_secs),
            quota_mb: env_or("CACHE_QUOTA_MB", defaults.quota_mb),
            max_body_bytes: env_or("CACHE_MAX_BODY_BYTES", defaults.max_body_bytes),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Middleware configuration derived from these settings.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_ttl(Duration::from_secs(self.ttl_secs))
            .with_swr(Duration::from_secs(self.swr_secs))
            .with_max_body_bytes(self.max_body_bytes)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            swr_secs: 60,
            quota_mb: 64,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            server_port: 3000,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
