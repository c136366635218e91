//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check quota accounting and recency order of the LRU store.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;

use crate::cache::store::LruIndex;
use crate::cache::{QuotaLru, ResponseEntry, Store};

// == Test Configuration ==
const TEST_QUOTA: usize = 1_000;

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}".prop_map(|s| s)
}

/// Generates body sizes, occasionally larger than the whole quota
fn body_len_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        8 => 0usize..300,
        1 => 900usize..1_500,
    ]
}

#[derive(Debug, Clone)]
enum StoreOp {
    Set { key: String, len: usize },
    Get { key: String },
    Delete { key: String },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        3 => (key_strategy(), body_len_strategy())
            .prop_map(|(key, len)| StoreOp::Set { key, len }),
        2 => key_strategy().prop_map(|key| StoreOp::Get { key }),
        1 => key_strategy().prop_map(|key| StoreOp::Delete { key }),
    ]
}

fn entry_of(len: usize) -> Arc<ResponseEntry> {
    Arc::new(ResponseEntry::new(
        StatusCode::OK,
        HeaderMap::new(),
        Bytes::from(vec![0u8; len]),
        Duration::from_secs(60),
        Duration::from_secs(60),
    ))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // After every set, the running total stays within quota and equals the
    // sum of the sizes of the entries actually held.
    #[test]
    fn prop_quota_and_accounting(ops in prop::collection::vec(store_op_strategy(), 1..80)) {
        let mut index = LruIndex::new(TEST_QUOTA);

        for op in ops {
            match op {
                StoreOp::Set { key, len } => {
                    let entry = entry_of(len);
                    let size = entry.size();
                    index.insert(&key, entry, size);
                    prop_assert!(index.current_bytes() <= TEST_QUOTA, "quota exceeded");
                }
                StoreOp::Get { key } => {
                    let _ = index.promote(&key);
                }
                StoreOp::Delete { key } => {
                    index.remove(&key);
                }
            }
            prop_assert_eq!(index.current_bytes(), index.recomputed_bytes(), "byte total drifted");
        }
    }

    // Filling the store with equal-sized entries, then reading one of them,
    // makes the next overflow evict the oldest untouched key instead.
    #[test]
    fn prop_get_promotes_key(
        keys in prop::collection::hash_set("[a-z]{3}", 3..8),
        pick in any::<prop::sample::Index>()
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let per_entry = 100;
        let mut index = LruIndex::new(per_entry * keys.len());

        for key in &keys {
            index.insert(key, entry_of(per_entry), per_entry);
        }

        let promoted = pick.get(&keys).clone();
        prop_assert!(index.promote(&promoted).is_some());

        index.insert("overflow", entry_of(per_entry), per_entry);

        let expected_victim = if promoted == keys[0] { &keys[1] } else { &keys[0] };
        prop_assert!(!index.contains(expected_victim), "oldest untouched key should be evicted");
        prop_assert!(index.contains(&promoted), "promoted key must survive");
        prop_assert!(index.contains("overflow"));
    }

    // Keys that are set and never evicted round-trip through the async store.
    #[test]
    fn prop_store_roundtrip(keys in prop::collection::hash_set(key_strategy(), 1..5), len in 0usize..100) {
        let store = QuotaLru::new(TEST_QUOTA);
        let keys: HashSet<String> = keys;

        tokio_test::block_on(async {
            for key in &keys {
                store.set(key, entry_of(len)).await.unwrap();
            }
        });

        for key in &keys {
            let found = tokio_test::block_on(store.get(key)).unwrap();
            prop_assert_eq!(found.map(|entry| entry.body.len()), Some(len));
        }
    }
}
