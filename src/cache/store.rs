//! Cache Store Module
//!
//! The cache facade: namespaced, expiry-aware get/set/remove plus bulk and
//! maintenance operations layered on a pluggable storage backend.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::StorageBackend;
use crate::cache::{expiry, CacheStats, KeySpace};
use crate::config::CacheConfig;
use crate::error::Result;

// == Cache Facade ==
/// Expiry-aware key-value cache over a storage backend.
///
/// Logical keys are namespaced with the configured prefixes, values are
/// stored as JSON text, and TTLs are tracked through a parallel expiry
/// record per key. Expiry is lazy: an expired entry is detected and removed
/// on the next read, or swept explicitly via [`Cache::cleanup`].
///
/// Every operation consults the availability flag computed by a one-time
/// probe at construction. On an unavailable backend all operations degrade
/// to neutral results (no-ops, `None`, empty counts) instead of failing.
#[derive(Debug)]
pub struct Cache<B: StorageBackend> {
    /// Underlying physical store
    backend: B,
    /// Prefix arithmetic for this namespace
    keyspace: KeySpace,
    /// Read statistics
    stats: CacheStats,
    /// Result of the one-time availability probe
    available: bool,
}

impl<B: StorageBackend> Cache<B> {
    // == Constructors ==
    /// Creates a cache over the given backend with the default namespace
    /// configuration.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, CacheConfig::default())
    }

    /// Creates a cache over the given backend with an explicit namespace
    /// configuration.
    ///
    /// Runs the availability probe: a set/get/remove cycle against the
    /// backend under the cache prefix. If any step fails the cache is
    /// permanently marked unavailable and every operation returns its
    /// neutral result. The probe is never retried.
    ///
    /// Construct the configuration through [`CacheConfig::new`] so the
    /// prefixes are validated.
    pub fn with_config(mut backend: B, config: CacheConfig) -> Self {
        let keyspace = KeySpace::new(&config);

        // Probe under the bare cache prefix: user keys are never empty, so
        // the slot cannot collide with a real entry.
        let probe_key = keyspace.value_key("");
        let available = match run_probe(&mut backend, &probe_key) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage backend unavailable, cache operations disabled");
                false
            }
        };

        Self {
            backend,
            keyspace,
            stats: CacheStats::new(),
            available,
        }
    }

    // == Set ==
    /// Stores a JSON-serializable value under a logical key, with an
    /// optional TTL in seconds.
    ///
    /// A no-op when the key is empty or the backend is unavailable. With a
    /// non-zero TTL the expiry deadline is written alongside the value;
    /// without one, any stale expiry record left by an earlier TTL write is
    /// cleared so the value becomes permanent.
    ///
    /// # Errors
    /// Returns `CacheError::Serialization` if the value cannot be encoded
    /// as JSON.
    pub fn set<T>(&mut self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if !self.available || key.is_empty() {
            return Ok(());
        }

        let encoded = serde_json::to_string(value)?;

        let expire_key = self.keyspace.expire_key(key);
        match ttl_seconds {
            Some(ttl) if ttl > 0 => {
                let deadline = expiry::deadline_for_ttl(ttl);
                self.backend_set(&expire_key, &expiry::encode(deadline));
            }
            _ => {
                // A leftover deadline from an earlier TTL write would
                // silently expire a value meant to be permanent.
                self.backend_remove(&expire_key);
            }
        }

        let value_key = self.keyspace.value_key(key);
        self.backend_set(&value_key, &encoded);
        Ok(())
    }

    // == Get ==
    /// Retrieves the value stored under a logical key.
    ///
    /// Returns `None` when the backend is unavailable, the key is absent,
    /// or the stored data is not parseable JSON (the backend may be shared
    /// with foreign writers). An entry found expired is removed, both
    /// records, before `None` is returned. A foreign empty string under the
    /// value key is handed back as an empty JSON string rather than `None`.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if !self.available {
            return None;
        }

        if self.has_expired(key) {
            self.remove(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            return None;
        }

        let value_key = self.keyspace.value_key(key);
        let raw = match self.backend_get(&value_key) {
            Some(raw) => raw,
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if raw.is_empty() {
            self.stats.record_hit();
            return Some(Value::String(raw));
        }

        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Err(_) => {
                // Foreign non-JSON data must not break callers.
                self.stats.record_miss();
                None
            }
        }
    }

    // == Remove ==
    /// Deletes both the value and expiry records for a logical key,
    /// regardless of expiry state. A no-op when unavailable.
    pub fn remove(&mut self, key: &str) {
        if !self.available {
            return;
        }

        let expire_key = self.keyspace.expire_key(key);
        let value_key = self.keyspace.value_key(key);
        self.backend_remove(&expire_key);
        self.backend_remove(&value_key);
    }

    // == Counters ==
    /// Increments the integer stored under a key and returns the new
    /// value. A missing or non-numeric value counts as 0. Returns `None`
    /// when unavailable.
    pub fn incr(&mut self, key: &str) -> Option<i64> {
        self.add(key, 1)
    }

    /// Decrements the integer stored under a key and returns the new
    /// value. A missing or non-numeric value counts as 0. Returns `None`
    /// when unavailable.
    pub fn decr(&mut self, key: &str) -> Option<i64> {
        self.add(key, -1)
    }

    fn add(&mut self, key: &str, delta: i64) -> Option<i64> {
        if !self.available {
            return None;
        }

        let current = self.get(key).map(coerce_integer).unwrap_or(0);
        let next = current + delta;
        // Integers always encode; the counter is stored without a TTL.
        if let Err(err) = self.set(key, &next, None) {
            warn!(key, error = %err, "failed to store counter");
        }
        Some(next)
    }

    // == Bulk Operations ==
    /// Stores every pair in the mapping with no TTL. A no-op when
    /// unavailable.
    ///
    /// # Errors
    /// Returns the first serialization failure encountered.
    pub fn set_many<T: Serialize>(&mut self, entries: &HashMap<String, T>) -> Result<()> {
        if !self.available {
            return Ok(());
        }

        for (key, value) in entries {
            self.set(key, value, None)?;
        }
        Ok(())
    }

    /// Retrieves the values for a list of keys, in input order. When the
    /// backend is unavailable the result is all-`None` with the input
    /// length, so the shape is consistent either way.
    pub fn get_many(&mut self, keys: &[&str]) -> Vec<Option<Value>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Removes every key in the list, in order. A no-op when unavailable.
    pub fn remove_many(&mut self, keys: &[&str]) {
        if !self.available {
            return;
        }

        for key in keys {
            self.remove(key);
        }
    }

    // == Flush ==
    /// Deletes every physical record in this cache's namespace, value and
    /// expiry records alike, regardless of expiry state. Unrelated backend
    /// keys are untouched. Returns the number of physical records removed.
    pub fn flush(&mut self) -> usize {
        if !self.available {
            return 0;
        }

        // Snapshot before removing: deleting a record shifts the
        // enumeration indices of everything after it.
        let doomed = self.snapshot_keys(|key| self.keyspace.owns(key));
        for key in &doomed {
            self.backend_remove(key);
        }

        debug!(removed = doomed.len(), "flushed cache namespace");
        doomed.len()
    }

    // == Length ==
    /// Counts the value records in this cache's namespace. Expiry records
    /// and foreign keys are excluded; expired-but-unswept entries still
    /// count. Returns 0 when unavailable.
    pub fn len(&self) -> usize {
        if !self.available {
            return 0;
        }

        self.snapshot_keys(|key| self.keyspace.owns_value(key)).len()
    }

    /// Returns true if the namespace holds no value records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Cleanup ==
    /// Sweeps the namespace and removes every expired entry, both records
    /// each. Non-expired entries are untouched. Returns the number of
    /// entries removed.
    ///
    /// This is the explicit maintenance counterpart to the lazy expiry in
    /// [`Cache::get`]; it is caller-invoked, never automatic.
    pub fn cleanup(&mut self) -> usize {
        if !self.available {
            return 0;
        }

        let expired: Vec<String> = self
            .snapshot_keys(|key| self.keyspace.owns_value(key))
            .iter()
            .filter_map(|physical| self.keyspace.logical_key(physical))
            .filter(|logical| self.has_expired(logical))
            .map(str::to_string)
            .collect();

        for key in &expired {
            self.remove(key);
        }

        if !expired.is_empty() {
            debug!(removed = expired.len(), "cleanup removed expired entries");
        }
        expired.len()
    }

    // == Accessors ==
    /// Returns the availability flag computed by the construction-time
    /// probe.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.len());
        stats
    }

    /// Borrows the underlying backend. Escape hatch for inspecting
    /// physical records.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutably borrows the underlying backend. Writes made through this
    /// bypass namespacing and serialization.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    // == Internal Helpers ==
    /// True if the key has an expiry record with a strictly-past deadline.
    /// Missing, non-positive, and unparseable records never expire.
    fn has_expired(&self, key: &str) -> bool {
        let expire_key = self.keyspace.expire_key(key);
        match self
            .backend_get(&expire_key)
            .and_then(|raw| expiry::decode(&raw))
        {
            Some(deadline) => expiry::is_past(deadline),
            None => false,
        }
    }

    /// Collects every physical key matching the predicate into an owned
    /// list, so callers can remove records without racing their own scan.
    fn snapshot_keys<F>(&self, matches: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let mut keys = Vec::new();
        let len = match self.backend.len() {
            Ok(len) => len,
            Err(err) => {
                warn!(error = %err, "backend enumeration failed");
                return keys;
            }
        };

        for index in 0..len {
            match self.backend.key_at(index) {
                Ok(Some(key)) if matches(&key) => keys.push(key),
                Ok(_) => {}
                Err(err) => {
                    warn!(index, error = %err, "backend enumeration failed");
                    break;
                }
            }
        }
        keys
    }

    /// Backend write with the per-operation error downgrade: a failure
    /// after a successful probe is logged and the operation proceeds as a
    /// no-op for this record.
    fn backend_set(&mut self, key: &str, value: &str) {
        if let Err(err) = self.backend.set(key, value) {
            warn!(key, error = %err, "backend write failed");
        }
    }

    fn backend_get(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "backend read failed");
                None
            }
        }
    }

    fn backend_remove(&mut self, key: &str) {
        if let Err(err) = self.backend.remove(key) {
            warn!(key, error = %err, "backend remove failed");
        }
    }
}

// == Utility Functions ==
/// Runs the availability probe: one set/get/remove cycle.
fn run_probe<B: StorageBackend>(backend: &mut B, probe_key: &str) -> Result<()> {
    backend.set(probe_key, probe_key)?;
    backend.get(probe_key)?;
    backend.remove(probe_key)?;
    Ok(())
}

/// Coerces a JSON value to an integer for the counter operations.
/// Anything non-numeric counts as 0.
fn coerce_integer(value: Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
