//! Configuration Module
//!
//! Handles the namespace prefixes used to keep cache records separate from
//! other users of the same backend.

use std::env;

use crate::error::{CacheError, Result};

// == Defaults ==
/// Default prefix for value records.
pub const DEFAULT_CACHE_PREFIX: &str = "___nscache___";

/// Default prefix for expiry records.
pub const DEFAULT_EXPIRE_PREFIX: &str = "___nscacheExpire___";

/// Cache namespace configuration.
///
/// Both prefixes are fixed for the lifetime of a cache instance. Multiple
/// independent caches can share one backend as long as their prefixes do
/// not collide.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Prefix applied to logical keys when storing values
    pub cache_prefix: String,
    /// Prefix applied to logical keys when storing expiry timestamps
    pub expire_prefix: String,
}

impl CacheConfig {
    /// Creates a validated configuration from the given prefixes.
    ///
    /// # Errors
    /// Returns `CacheError::InvalidConfig` if either prefix is empty, the
    /// prefixes are equal, or one prefix starts with the other. Nested
    /// prefixes would let expiry records be enumerated as value records.
    pub fn new(cache_prefix: impl Into<String>, expire_prefix: impl Into<String>) -> Result<Self> {
        let config = Self {
            cache_prefix: cache_prefix.into(),
            expire_prefix: expire_prefix.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates a configuration by loading prefixes from environment variables.
    ///
    /// # Environment Variables
    /// - `NSCACHE_PREFIX` - Value record prefix (default: `___nscache___`)
    /// - `NSCACHE_EXPIRE_PREFIX` - Expiry record prefix (default: `___nscacheExpire___`)
    ///
    /// An invalid combination falls back to the defaults.
    pub fn from_env() -> Self {
        let cache_prefix = env::var("NSCACHE_PREFIX")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CACHE_PREFIX.to_string());
        let expire_prefix = env::var("NSCACHE_EXPIRE_PREFIX")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_EXPIRE_PREFIX.to_string());

        Self::new(cache_prefix, expire_prefix).unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        if self.cache_prefix.is_empty() || self.expire_prefix.is_empty() {
            return Err(CacheError::InvalidConfig(
                "prefixes must be non-empty".to_string(),
            ));
        }
        if self.cache_prefix.starts_with(&self.expire_prefix)
            || self.expire_prefix.starts_with(&self.cache_prefix)
        {
            return Err(CacheError::InvalidConfig(format!(
                "prefixes '{}' and '{}' overlap",
                self.cache_prefix, self.expire_prefix
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            expire_prefix: DEFAULT_EXPIRE_PREFIX.to_string(),
        }
    }
}
