//! Cache Module
//!
//! Response entries, the pluggable store contract and the quota-bounded LRU backend.

mod entry;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{Freshness, ResponseEntry};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{QuotaLru, Store};

// == Public Constants ==
/// Size charged per header name/value pair when accounting entry size
pub const HEADER_PAIR_OVERHEAD: usize = 30;
