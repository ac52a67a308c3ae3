//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the cache facade's behavioral contracts.

use proptest::prelude::*;
use std::collections::HashSet;

use serde_json::Value;

use crate::backend::{MemoryBackend, StorageBackend};
use crate::cache::Cache;
use crate::error::{CacheError, Result};

// == Strategies ==
/// Generates valid cache keys (non-empty, within a sane length)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}"
}

/// Generates arbitrary JSON-serializable values, including nested
/// containers. Floats are excluded so deep-equality survives the
/// encode/decode round trip exactly.
fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,32}".prop_map(Value::String),
    ];
    leaf.prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::hash_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), json_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

// == Failing Backend ==
/// Backend double whose every operation fails.
#[derive(Debug, Default)]
struct FailingBackend;

impl StorageBackend for FailingBackend {
    fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
        Err(CacheError::Backend("storage offline".to_string()))
    }

    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(CacheError::Backend("storage offline".to_string()))
    }

    fn remove(&mut self, _key: &str) -> Result<()> {
        Err(CacheError::Backend("storage offline".to_string()))
    }

    fn len(&self) -> Result<usize> {
        Err(CacheError::Backend("storage offline".to_string()))
    }

    fn key_at(&self, _index: usize) -> Result<Option<String>> {
        Err(CacheError::Backend("storage offline".to_string()))
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any key and JSON-serializable value, a set followed by a get
    // returns a value deep-equal to the one stored.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in json_value_strategy()) {
        let mut cache = Cache::new(MemoryBackend::new());

        cache.set(&key, &value, None).unwrap();

        prop_assert_eq!(cache.get(&key), Some(value), "Round-trip value mismatch");
    }

    // For any key, storing V1 and then V2 results in get returning V2,
    // with exactly one entry in the namespace.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        first in json_value_strategy(),
        second in json_value_strategy()
    ) {
        let mut cache = Cache::new(MemoryBackend::new());

        cache.set(&key, &first, None).unwrap();
        cache.set(&key, &second, None).unwrap();

        prop_assert_eq!(cache.get(&key), Some(second), "Overwrite should return new value");
        prop_assert_eq!(cache.len(), 1, "Should have exactly one entry after overwrite");
    }

    // For any stored entry, remove deletes both physical records and
    // makes subsequent gets miss.
    #[test]
    fn prop_remove_removes_entry(
        key in valid_key_strategy(),
        value in json_value_strategy(),
        ttl in prop::option::of(1u64..3600)
    ) {
        let mut cache = Cache::new(MemoryBackend::new());

        cache.set(&key, &value, ttl).unwrap();
        prop_assert!(cache.get(&key).is_some(), "Key should exist before remove");

        cache.remove(&key);

        prop_assert_eq!(cache.get(&key), None, "Key should not exist after remove");
        prop_assert_eq!(cache.len(), 0);
        prop_assert_eq!(cache.backend().len().unwrap(), 0, "No physical records may remain");
    }

    // get_many returns one slot per requested key, in input order.
    #[test]
    fn prop_get_many_preserves_order(
        entries in prop::collection::vec(
            (valid_key_strategy(), prop::option::of(json_value_strategy())),
            1..12
        )
    ) {
        // Deduplicate by key, keeping the first occurrence.
        let mut seen = HashSet::new();
        let entries: Vec<_> = entries
            .into_iter()
            .filter(|(key, _)| seen.insert(key.clone()))
            .collect();

        let mut cache = Cache::new(MemoryBackend::new());
        for (key, value) in &entries {
            if let Some(value) = value {
                cache.set(key, value, None).unwrap();
            }
        }

        let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
        let results = cache.get_many(&keys);

        prop_assert_eq!(results.len(), keys.len(), "One slot per requested key");
        for ((_, expected), actual) in entries.iter().zip(&results) {
            prop_assert_eq!(actual, expected);
        }
    }

    // len counts one value record per distinct key, whether or not the
    // entry carries a TTL.
    #[test]
    fn prop_len_counts_value_records(
        entries in prop::collection::hash_map(
            valid_key_strategy(),
            (json_value_strategy(), prop::option::of(60u64..3600)),
            0..20
        )
    ) {
        let mut cache = Cache::new(MemoryBackend::new());

        for (key, (value, ttl)) in &entries {
            cache.set(key, value, *ttl).unwrap();
        }

        prop_assert_eq!(cache.len(), entries.len());
    }

    // For any sequence of operations, the hit and miss counters reflect
    // the outcome of every get.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut cache = Cache::new(MemoryBackend::new());
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(&key, &value, None).unwrap();
                }
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, cache.len(), "Total entries mismatch");
    }

    // For any sequence of operations against an unavailable backend,
    // every operation returns its neutral result and nothing panics.
    #[test]
    fn prop_unavailable_backend_is_neutral(ops in prop::collection::vec(cache_op_strategy(), 1..30)) {
        let mut cache = Cache::new(FailingBackend);
        prop_assert!(!cache.is_available());

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    prop_assert!(cache.set(&key, &value, Some(60)).is_ok());
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), None);
                }
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                }
            }
        }

        prop_assert_eq!(cache.len(), 0);
        prop_assert_eq!(cache.flush(), 0);
        prop_assert_eq!(cache.cleanup(), 0);
    }
}
