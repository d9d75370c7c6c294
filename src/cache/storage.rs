//! Cache Storage Module
//!
//! Pure key to entry containers. Storage knows nothing about TTLs; expiry
//! is decided by the handler that owns it.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Storage Trait ==
/// Key to entry mapping owned by a `CacheHandler`.
///
/// Implementations never mutate a stored entry in place; `set` replaces it.
pub trait Storage {
    /// Returns true if an entry is stored under `key`.
    fn has(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<&CacheEntry>;

    /// Stores `entry` under `key`, replacing any existing entry.
    fn set(&mut self, key: String, entry: CacheEntry);

    fn delete(&mut self, key: &str);

    fn clear(&mut self);

    /// All stored keys, in no particular order.
    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize {
        self.keys().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Map Storage ==
/// HashMap-backed storage.
#[derive(Debug, Default)]
pub struct MapStorage {
    entries: HashMap<String, CacheEntry>,
}

impl MapStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MapStorage {
    fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    fn set(&mut self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
