//! Capsule Cache - An in-process HTTP response cache
//!
//! Quota-bounded LRU storage of whole responses with TTL and
//! stale-while-revalidate refresh, usable as a tower layer.

pub mod api;
pub mod cache;
pub mod capture;
pub mod config;
pub mod error;
pub mod headers;
pub mod keys;
pub mod middleware;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStats, Freshness, QuotaLru, ResponseEntry, Store};
pub use capture::{ClientSink, DiscardSink, ResponseRecorder, ResponseSink};
pub use config::{CacheConfig, Settings};
pub use error::{CacheError, Result};
pub use middleware::{CacheLayer, CacheMiddleware, Handler};
pub use tasks::spawn_detached;
