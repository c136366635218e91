//! Cache Statistics Module
//!
//! Snapshot of store activity: hits, misses, evictions and byte usage.

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time view of a store's counters and occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned an entry
    pub hits: u64,
    /// Lookups that found nothing (including entries evicted mid-lookup)
    pub misses: u64,
    /// Entries removed by quota enforcement
    pub evictions: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Sum of entry sizes currently tracked
    pub total_bytes: usize,
    /// Configured byte quota
    pub max_bytes: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_bytes, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = CacheStats {
            hits: 1,
            max_bytes: 1024,
            ..CacheStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["hits"], 1);
        assert_eq!(json["max_bytes"], 1024);
    }
}
