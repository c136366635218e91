//! Cache Entry Module
//!
//! Defines the stored response snapshot and its TTL / stale-while-revalidate windows.

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use tokio::time::Instant;

use crate::cache::HEADER_PAIR_OVERHEAD;

// == Freshness ==
/// Freshness of an entry derived from its age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// age <= ttl
    Fresh,
    /// ttl < age <= ttl + swr
    Stale,
    /// age > ttl + swr, treated as absent
    Rotten,
}

// == Response Entry ==
/// An immutable snapshot of a handler response.
///
/// Stores never mutate an entry in place; a `set` replaces it wholesale.
#[derive(Debug, Clone)]
pub struct ResponseEntry {
    /// Response status code
    pub status: StatusCode,
    /// Sanitized response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
    /// Creation instant on the runtime clock
    pub created_at: Instant,
    /// Time-to-live (freshness window)
    pub ttl: Duration,
    /// Stale-while-revalidate window following the TTL
    pub swr: Duration,
}

impl ResponseEntry {
    // == Constructor ==
    /// Creates an entry stamped with the current instant.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        ttl: Duration,
        swr: Duration,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            created_at: Instant::now(),
            ttl,
            swr,
        }
    }

    // == Age ==
    /// Time elapsed since creation, measured at `now`.
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    // == Freshness ==
    /// Classifies the entry at the given instant.
    ///
    /// Boundaries are inclusive on the younger side: an entry whose age equals
    /// the TTL is still fresh, and one whose age equals TTL + SWR is still stale.
    pub fn freshness_at(&self, now: Instant) -> Freshness {
        let age = self.age_at(now);
        if age <= self.ttl {
            Freshness::Fresh
        } else if age <= self.ttl.saturating_add(self.swr) {
            Freshness::Stale
        } else {
            Freshness::Rotten
        }
    }

    /// Classifies the entry right now.
    pub fn freshness(&self) -> Freshness {
        self.freshness_at(Instant::now())
    }

    // == Size ==
    /// Estimated footprint used for quota accounting.
    ///
    /// Body length plus a fixed overhead per header name/value pair. This is a
    /// heuristic, not exact memory accounting.
    pub fn size(&self) -> usize {
        self.body.len() + self.headers.len() * HEADER_PAIR_OVERHEAD
    }
}
