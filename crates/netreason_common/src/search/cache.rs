//! Session caches for search results and parsed pages.
//!
//! Caches live as long as the `WebRetriever` that owns them. No eviction,
//! no negative entries. Writes are insert-if-absent so two concurrent
//! queries racing on one key both end up with the same stored value.

use super::{ParsedPage, SearchResult};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Content-address key for a URL: lowercase hex SHA-256 of its bytes
pub fn content_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// String-keyed map behind a lock
#[derive(Debug)]
pub struct KeyedCache<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V: Clone> KeyedCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Store `value` unless `key` is already present. Returns whatever is
    /// stored under `key` afterwards.
    pub fn insert_if_absent(&self, key: &str, value: V) -> V {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_insert(value)
            .clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for KeyedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exact query string -> provider results
pub type SearchCache = KeyedCache<Vec<SearchResult>>;

/// URL content key -> parsed page
pub type ParseCache = KeyedCache<ParsedPage>;
