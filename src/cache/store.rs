//! TTL cache store
//!
//! Plain map of cache entries. The store is owned exclusively by the cache
//! worker task, so none of these methods need locking.

use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::keys::{CacheKey, Namespace};

/// Opaque cached payload
pub type CacheValue = Arc<dyn Any + Send + Sync>;

/// Cache entry with expiry metadata
#[derive(Clone)]
pub struct CacheEntry {
    pub value: CacheValue,
    pub last_touched: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(value: CacheValue, ttl: Duration) -> Self {
        Self {
            value,
            last_touched: Instant::now(),
            ttl,
        }
    }

    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_touched) > self.ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub entries_by_namespace: BTreeMap<String, usize>,
    pub default_ttl_ms: u64,
    pub sweeps: u64,
    pub evicted: u64,
}

pub struct CacheStore {
    entries: HashMap<CacheKey, CacheEntry>,
    default_ttl: Duration,
    sweeps: u64,
    evicted: u64,
}

impl CacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
            sweeps: 0,
            evicted: 0,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Only affects entries inserted afterwards
    pub fn set_default_ttl(&mut self, ttl: Duration) {
        self.default_ttl = ttl;
    }

    /// Insert if absent. Returns false when the key was already present.
    pub fn insert(&mut self, key: CacheKey, value: CacheValue, ttl: Option<Duration>) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.entries.insert(key, CacheEntry::new(value, ttl));
        true
    }

    pub fn remove(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn fetch(&mut self, key: &CacheKey) -> Option<CacheValue> {
        let entry = self.entries.get_mut(key)?;
        entry.touch();
        Some(Arc::clone(&entry.value))
    }

    pub fn flush_all(&mut self) {
        self.entries.clear();
    }

    pub fn flush_by_type(&mut self, namespace: &Namespace) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.namespace != *namespace);
        before - self.entries.len()
    }

    pub fn fetch_all_of_type(&self, namespace: &Namespace) -> Vec<CacheValue> {
        self.entries
            .iter()
            .filter(|(key, _)| key.namespace == *namespace)
            .map(|(_, entry)| Arc::clone(&entry.value))
            .collect()
    }

    /// Evict every entry that has outlived its ttl
    pub fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.sweeps += 1;
        self.evicted += removed as u64;
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let mut entries_by_namespace = BTreeMap::new();
        for key in self.entries.keys() {
            *entries_by_namespace
                .entry(key.namespace.to_string())
                .or_insert(0) += 1;
        }

        CacheStats {
            entry_count: self.entries.len(),
            entries_by_namespace,
            default_ttl_ms: u64::try_from(self.default_ttl.as_millis()).unwrap_or(u64::MAX),
            sweeps: self.sweeps,
            evicted: self.evicted,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
