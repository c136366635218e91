//! Cache Store Module
//!
//! The pluggable store contract and the quota-bounded LRU reference backend.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheStats, LruTracker, ResponseEntry};
use crate::error::{CacheError, Result};

// == Store Contract ==
/// Key to entry backend used by the middleware.
///
/// Any backend (remote cache, persistent KV) that honours these semantics is a
/// drop-in replacement for [`QuotaLru`]:
/// - `get` is safe for unlimited concurrent callers. Backend failures are
///   reported as `Err` and treated as a miss by the caller.
/// - `set` inserts or wholly replaces, applying the backend's admission policy
///   atomically with respect to concurrent `set`/`delete`.
/// - `delete` removes the key if present; absent keys are not an error.
/// - `close` releases resources and is idempotent.
pub trait Store: Send + Sync + 'static {
    fn get(&self, key: &str)
        -> impl Future<Output = Result<Option<Arc<ResponseEntry>>>> + Send;

    fn set(&self, key: &str, entry: Arc<ResponseEntry>) -> impl Future<Output = Result<()>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}

// == LRU Index ==
#[derive(Debug)]
struct Slot {
    entry: Arc<ResponseEntry>,
    size: usize,
}

/// Entry map, recency order and running byte total, guarded together.
///
/// Invariant: once `insert` returns, `current_bytes <= max_bytes`.
#[derive(Debug)]
pub(crate) struct LruIndex {
    entries: HashMap<String, Slot>,
    order: LruTracker,
    current_bytes: usize,
    max_bytes: usize,
    evictions: u64,
}

impl LruIndex {
    pub(crate) fn new(max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: LruTracker::new(),
            current_bytes: 0,
            max_bytes,
            evictions: 0,
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the entry and moves it to the most recently used end.
    pub(crate) fn promote(&mut self, key: &str) -> Option<Arc<ResponseEntry>> {
        let entry = self.entries.get(key)?.entry.clone();
        self.order.touch(key);
        Some(entry)
    }

    /// Inserts or replaces `key`, then evicts from the least recently used end
    /// until the total fits the quota. Returns how many entries were evicted.
    pub(crate) fn insert(&mut self, key: &str, entry: Arc<ResponseEntry>, size: usize) -> usize {
        match self.entries.get_mut(key) {
            Some(slot) => {
                self.current_bytes -= slot.size;
                slot.entry = entry;
                slot.size = size;
            }
            None => {
                self.entries.insert(key.to_string(), Slot { entry, size });
            }
        }
        self.current_bytes += size;
        self.order.touch(key);

        let mut evicted = 0;
        while self.current_bytes > self.max_bytes {
            let Some(oldest) = self.order.evict_oldest() else {
                break;
            };
            if let Some(slot) = self.entries.remove(&oldest) {
                self.current_bytes -= slot.size;
                self.evictions += 1;
                evicted += 1;
                debug!(cache_key = %oldest, size = slot.size, "evicted entry");
            }
        }
        evicted
    }

    /// Removes `key` if present.
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(slot) => {
                self.order.remove(key);
                self.current_bytes -= slot.size;
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.order = LruTracker::new();
        self.current_bytes = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn current_bytes(&self) -> usize {
        self.current_bytes
    }

    pub(crate) fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub(crate) fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Sum of the sizes of the entries actually held.
    #[cfg(test)]
    pub(crate) fn recomputed_bytes(&self) -> usize {
        self.entries.values().map(|slot| slot.size).sum()
    }
}

// == Quota LRU Store ==
/// In-memory store with a hard byte quota and LRU eviction.
///
/// A single `RwLock` guards the index, the recency order and the running
/// total together. Lookups check existence under the shared section, then
/// re-verify under the exclusive section before promoting.
#[derive(Debug)]
pub struct QuotaLru {
    index: RwLock<LruIndex>,
    hits: AtomicU64,
    misses: AtomicU64,
    closed: AtomicBool,
}

impl QuotaLru {
    // == Constructor ==
    /// Creates a store holding at most `max_bytes` of entry size.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            index: RwLock::new(LruIndex::new(max_bytes)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a store with a quota expressed in megabytes.
    pub fn with_megabytes(max_mb: usize) -> Self {
        Self::new(max_mb * 1024 * 1024)
    }

    // == Stats ==
    /// Returns current store statistics.
    pub async fn stats(&self) -> CacheStats {
        let index = self.index.read().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: index.evictions(),
            total_entries: index.len(),
            total_bytes: index.current_bytes(),
            max_bytes: index.max_bytes(),
        }
    }

    // == Length ==
    /// Returns the current number of entries.
    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn record_miss(&self) -> Result<Option<Arc<ResponseEntry>>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed);
        }
        Ok(())
    }
}

impl Store for QuotaLru {
    // == Get ==
    async fn get(&self, key: &str) -> Result<Option<Arc<ResponseEntry>>> {
        self.ensure_open()?;

        // Phase 1: shared section, existence only
        if !self.index.read().await.contains(key) {
            return self.record_miss();
        }

        // Phase 2: exclusive section, re-verify before promoting
        let mut index = self.index.write().await;
        match index.promote(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry))
            }
            None => {
                debug!(cache_key = %key, "entry vanished between lookup phases");
                self.record_miss()
            }
        }
    }

    // == Set ==
    async fn set(&self, key: &str, entry: Arc<ResponseEntry>) -> Result<()> {
        // Sized outside the critical section
        let size = entry.size();

        let mut index = self.index.write().await;
        self.ensure_open()?;
        let evicted = index.insert(key, entry, size);
        if evicted > 0 {
            debug!(
                cache_key = %key,
                evicted,
                total_bytes = index.current_bytes(),
                "quota enforced"
            );
        }
        Ok(())
    }

    // == Delete ==
    async fn delete(&self, key: &str) -> Result<()> {
        self.index.write().await.remove(key);
        Ok(())
    }

    // == Close ==
    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.index.write().await.clear();
            debug!("quota LRU store closed");
        }
        Ok(())
    }
}
