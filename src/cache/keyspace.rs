//! Key Namespacing Module
//!
//! Maps logical cache keys to the physical keys stored in the backend and
//! back again. Every entry owns up to two physical records: a value record
//! under the cache prefix and an expiry record under the expire prefix.

use crate::config::CacheConfig;

// == Key Space ==
/// Derives physical keys from logical keys for one cache namespace.
#[derive(Debug, Clone)]
pub struct KeySpace {
    cache_prefix: String,
    expire_prefix: String,
}

impl KeySpace {
    /// Creates a key space from a validated configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            cache_prefix: config.cache_prefix.clone(),
            expire_prefix: config.expire_prefix.clone(),
        }
    }

    /// Returns the physical key holding the value for a logical key.
    pub fn value_key(&self, key: &str) -> String {
        format!("{}{}", self.cache_prefix, key)
    }

    /// Returns the physical key holding the expiry timestamp for a
    /// logical key.
    pub fn expire_key(&self, key: &str) -> String {
        format!("{}{}", self.expire_prefix, key)
    }

    /// Recovers the logical key from a value record's physical key.
    ///
    /// Returns `None` for physical keys outside this namespace's value
    /// prefix.
    pub fn logical_key<'a>(&self, physical: &'a str) -> Option<&'a str> {
        physical.strip_prefix(self.cache_prefix.as_str())
    }

    /// Returns true if a physical key is a value record of this namespace.
    pub fn owns_value(&self, physical: &str) -> bool {
        physical.starts_with(self.cache_prefix.as_str())
    }

    /// Returns true if a physical key is an expiry record of this
    /// namespace.
    pub fn owns_expiry(&self, physical: &str) -> bool {
        physical.starts_with(self.expire_prefix.as_str())
    }

    /// Returns true if a physical key belongs to this namespace at all.
    pub fn owns(&self, physical: &str) -> bool {
        self.owns_value(physical) || self.owns_expiry(physical)
    }
}
