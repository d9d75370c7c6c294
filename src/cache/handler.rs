//! Cache Handler Module
//!
//! The public face of the cache: enable switch, default TTL, lazy expiry,
//! value isolation and the snapshot protocol.

use chrono::Duration;
use tracing::{debug, warn};

use crate::cache::snapshot::Snapshot;
use crate::cache::{CacheEntry, CacheFactory, Factory, MapStorage, Storage, Value};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Cache Handler ==
/// Per-scope memoization cache.
///
/// Reads (`has`, `get`) report nothing while the handler is disabled; writes,
/// deletes, clears and snapshots keep acting on storage regardless.
///
/// The handler performs no locking. Give each request or session its own
/// instance, or wrap a shared one in a mutex.
#[derive(Debug)]
pub struct CacheHandler<S = MapStorage, F = CacheFactory> {
    storage: S,
    factory: F,
    enabled: bool,
    default_ttl: Duration,
}

impl CacheHandler {
    /// Creates a handler over `MapStorage` and the wall clock.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(MapStorage::new(), CacheFactory::default(), config)
    }
}

impl<S: Storage, F: Factory> CacheHandler<S, F> {
    // == Constructor ==
    /// Creates a handler owning `storage` and `factory`, with the enabled
    /// flag and default TTL taken from `config`.
    pub fn new(storage: S, factory: F, config: &CacheConfig) -> Self {
        Self {
            storage,
            factory,
            enabled: config.enabled,
            default_ttl: config.ttl,
        }
    }

    // == Set ==
    /// Stores a copy of `value` under `key`, replacing any existing entry.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to copy into the cache
    /// * `ttl` - Optional TTL (uses the default TTL if None)
    ///
    /// # Errors
    /// `CacheError::UnclonableValue` if `value` holds a `Handle`, or
    /// `CacheError::NestingTooDeep` past `MAX_VALUE_DEPTH`; the existing
    /// entry under `key`, if any, is left untouched.
    pub fn set(&mut self, key: impl Into<String>, value: &Value, ttl: Option<Duration>) -> Result<()> {
        let key = key.into();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = self.factory.create(value, ttl)?;

        debug!(key = %key, ttl_ms = ttl.num_milliseconds(), "cache set");
        self.storage.set(key, entry);
        Ok(())
    }

    // == Has ==
    /// Returns true if `key` holds a live entry and the cache is enabled.
    ///
    /// Expired entries are left in storage; only `get` removes them.
    pub fn has(&self, key: &str) -> bool {
        if !self.enabled || !self.storage.has(key) {
            return false;
        }

        match self.storage.get(key) {
            Some(entry) => !entry.is_expired(self.factory.now()),
            None => {
                warn!(key = %key, "storage reports key present but returned no entry");
                false
            }
        }
    }

    // == Get ==
    /// Returns a fresh copy of the value under `key`.
    ///
    /// Returns None when the cache is disabled, the key is absent, or the
    /// entry has expired. An expired entry is removed from storage.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if !self.enabled {
            return None;
        }

        let now = self.factory.now();
        match self.storage.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(entry.value().clone()),
            Some(_) => {}
        }

        debug!(key = %key, "removing expired cache entry");
        self.storage.delete(key);
        None
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, or computes, stores and returns it.
    ///
    /// While the cache is disabled `compute` always runs and its result is
    /// still written.
    pub fn get_or_set_with<K, C>(&mut self, key: K, ttl: Option<Duration>, compute: C) -> Result<Value>
    where
        K: Into<String>,
        C: FnOnce() -> Value,
    {
        let key = key.into();
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = compute();
        self.set(key, &value, ttl)?;
        Ok(value)
    }

    // == Delete ==
    /// Removes the entry under `key`, whether or not the cache is enabled.
    pub fn delete(&mut self, key: &str) {
        debug!(key = %key, "cache delete");
        self.storage.delete(key);
    }

    // == Clear ==
    /// Removes every entry, whether or not the cache is enabled.
    pub fn clear(&mut self) {
        debug!(entries = self.storage.len(), "cache clear");
        self.storage.clear();
    }

    // == Enable / Disable ==
    /// Makes stored entries visible to `has` and `get` again.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Hides every entry from `has` and `get`; stored data is kept.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    // == Serialize ==
    /// Produces a snapshot of every live entry with its remaining TTL.
    ///
    /// # Errors
    /// `CacheError::Serialization` if any live value holds a `Handle`, nests
    /// past `MAX_VALUE_DEPTH`, or holds a number with no textual form. Cache
    /// state is unchanged.
    pub fn serialize(&self) -> Result<String> {
        let now = self.factory.now();
        let mut snapshot = Snapshot::new();

        for key in self.storage.keys() {
            let Some(entry) = self.storage.get(&key) else {
                continue;
            };
            if entry.is_expired(now) {
                continue;
            }

            entry
                .value()
                .ensure_data()
                .map_err(|e| CacheError::Serialization(format!("key `{}`: {}", key, e)))?;

            let remaining = entry.remaining_ttl(now);
            snapshot.insert(key, entry.value(), remaining);
        }

        let text = snapshot.to_text()?;
        debug!(entries = snapshot.entries.len(), bytes = text.len(), "cache serialized");
        Ok(text)
    }

    // == Deserialize ==
    /// Restores entries from a snapshot produced by `serialize`.
    ///
    /// Each entry expires its recorded remaining TTL from now. Existing
    /// entries under the same keys are replaced; other keys are kept.
    ///
    /// # Errors
    /// `CacheError::Deserialization` on malformed input, in which case no
    /// entry is written.
    pub fn deserialize(&mut self, text: &str) -> Result<()> {
        let snapshot: Snapshot<Value> = Snapshot::from_text(text)?;

        let entries = snapshot
            .entries
            .into_iter()
            .map(|(key, item)| {
                let entry = self
                    .factory
                    .create(&item.value, item.ttl())
                    .map_err(|e| CacheError::Deserialization(format!("key `{}`: {}", key, e)))?;
                Ok((key, entry))
            })
            .collect::<Result<Vec<(String, CacheEntry)>>>()?;

        debug!(entries = entries.len(), "cache deserialized");
        for (key, entry) in entries {
            self.storage.set(key, entry);
        }
        Ok(())
    }
}
