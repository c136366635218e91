//! Refresh Deduplication
//!
//! Keeps at most one background refresh in flight per cache key.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// == Refresh Group ==
/// Set of keys with a refresh currently running.
///
/// Only overlapping triggers are collapsed: once a permit is dropped, the next
/// trigger for the same key starts a new refresh.
#[derive(Debug, Default)]
pub struct RefreshGroup {
    in_flight: Mutex<HashSet<String>>,
}

impl RefreshGroup {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `key` for a refresh.
    ///
    /// Returns `None` if a refresh for `key` is already running; the caller
    /// then relies on that one instead of starting its own.
    pub fn try_begin(self: &Arc<Self>, key: &str) -> Option<RefreshPermit> {
        if !self.keys().insert(key.to_string()) {
            return None;
        }
        Some(RefreshPermit {
            group: Arc::clone(self),
            key: key.to_string(),
        })
    }

    /// Number of refreshes currently running.
    pub fn in_flight(&self) -> usize {
        self.keys().len()
    }

    #[cfg(test)]
    pub(crate) fn is_in_flight(&self, key: &str) -> bool {
        self.keys().contains(key)
    }
}

// == Refresh Permit ==
/// Exclusive right to refresh one key. Dropping it (also while unwinding)
/// releases the key.
#[derive(Debug)]
pub struct RefreshPermit {
    group: Arc<RefreshGroup>,
    key: String,
}

impl RefreshPermit {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        self.group.keys().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_triggers_collapse() {
        let group = Arc::new(RefreshGroup::new());

        let permit = group.try_begin("k").unwrap();
        assert_eq!(permit.key(), "k");
        assert!(group.try_begin("k").is_none());
        assert!(group.is_in_flight("k"));
        assert_eq!(group.in_flight(), 1);
    }

    #[test]
    fn test_distinct_keys_do_not_block_each_other() {
        let group = Arc::new(RefreshGroup::new());

        let _a = group.try_begin("a").unwrap();
        let _b = group.try_begin("b").unwrap();
        assert_eq!(group.in_flight(), 2);
    }

    #[test]
    fn test_sequential_triggers_are_not_suppressed() {
        let group = Arc::new(RefreshGroup::new());

        drop(group.try_begin("k").unwrap());

        assert!(!group.is_in_flight("k"));
        assert!(group.try_begin("k").is_some());
    }

    #[test]
    fn test_permit_released_on_unwind() {
        let group = Arc::new(RefreshGroup::new());
        let cloned = group.clone();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _permit = cloned.try_begin("k").unwrap();
            panic!("refresh failed");
        }));

        assert!(result.is_err());
        assert_eq!(group.in_flight(), 0);
    }

    #[test]
    fn test_concurrent_claims_yield_one_permit() {
        let group = Arc::new(RefreshGroup::new());
        let barrier = std::sync::Barrier::new(16);

        let granted: Vec<Option<RefreshPermit>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let group = group.clone();
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        group.try_begin("hot")
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(granted.iter().filter(|p| p.is_some()).count(), 1);
    }
}
