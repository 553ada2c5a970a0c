//! Cache Store Module
//!
//! The set of named response caches. Every component reads it; strategies,
//! the precache installer and activation cleanup write to it. No entry-level
//! locking is done: writes to the same key are last-write-wins and deletes
//! of missing entries are no-ops.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EntryMeta, SharedClock};
use crate::models::Response;

#[derive(Debug, Default)]
struct NamedCache {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl NamedCache {
    fn sync_count(&mut self) {
        self.stats.set_total_entries(self.entries.len());
    }
}

// == Cache Storage ==
/// Shared handle to all named caches of one origin.
///
/// Cloning is cheap; clones see the same caches.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    caches: Arc<RwLock<BTreeMap<String, NamedCache>>>,
    sequence: Arc<AtomicU64>,
    clock: SharedClock,
}

impl CacheStorage {
    // == Constructor ==
    pub fn new(clock: SharedClock) -> Self {
        Self {
            caches: Arc::new(RwLock::new(BTreeMap::new())),
            sequence: Arc::new(AtomicU64::new(0)),
            clock,
        }
    }

    /// Current time according to the storage clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // == Cache-level operations ==
    /// Creates the named cache if it does not exist yet.
    pub async fn open(&self, name: &str) {
        let mut caches = self.caches.write().await;
        caches.entry(name.to_string()).or_default();
    }

    pub async fn has(&self, name: &str) -> bool {
        self.caches.read().await.contains_key(name)
    }

    /// Names of all caches in lexical order.
    pub async fn names(&self) -> Vec<String> {
        self.caches.read().await.keys().cloned().collect()
    }

    /// Drops a whole cache. Returns false if it did not exist.
    pub async fn delete_cache(&self, name: &str) -> bool {
        let removed = self.caches.write().await.remove(name).is_some();
        if removed {
            debug!(cache = %name, "Deleted cache");
        }
        removed
    }

    // == Put ==
    /// Stores a response, replacing any entry under the same key.
    ///
    /// The cache is created on first write.
    pub async fn put(&self, name: &str, key: &str, response: Response, revision: Option<String>) {
        let entry = CacheEntry {
            key: key.to_string(),
            response,
            inserted_at: self.clock.now_ms(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            revision,
        };

        let mut caches = self.caches.write().await;
        let cache = caches.entry(name.to_string()).or_default();
        cache.entries.insert(key.to_string(), entry);
        cache.stats.record_write();
        cache.sync_count();
    }

    // == Match ==
    /// Looks up an entry and records a hit or miss.
    pub async fn match_entry(&self, name: &str, key: &str) -> Option<CacheEntry> {
        let mut caches = self.caches.write().await;
        let cache = caches.get_mut(name)?;
        let found = cache.entries.get(key).cloned();
        cache.stats.record_lookup(found.is_some());
        found
    }

    /// Looks up an entry without touching statistics.
    pub async fn peek(&self, name: &str, key: &str) -> Option<CacheEntry> {
        let caches = self.caches.read().await;
        caches.get(name)?.entries.get(key).cloned()
    }

    // == Delete ==
    /// Removes an entry. Missing caches or keys are not an error.
    pub async fn delete(&self, name: &str, key: &str) -> bool {
        let mut caches = self.caches.write().await;
        match caches.get_mut(name) {
            Some(cache) => {
                let removed = cache.entries.remove(key).is_some();
                cache.sync_count();
                removed
            }
            None => false,
        }
    }

    // == Listing ==
    /// Snapshot of a cache's keys and insertion order.
    pub async fn entries(&self, name: &str) -> Vec<EntryMeta> {
        let caches = self.caches.read().await;
        caches
            .get(name)
            .map(|cache| cache.entries.values().map(CacheEntry::meta).collect())
            .unwrap_or_default()
    }

    /// Keys of a cache in lexical order.
    pub async fn keys(&self, name: &str) -> Vec<String> {
        let caches = self.caches.read().await;
        let mut keys: Vec<String> = caches
            .get(name)
            .map(|cache| cache.entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub async fn len(&self, name: &str) -> usize {
        let caches = self.caches.read().await;
        caches.get(name).map(|c| c.entries.len()).unwrap_or(0)
    }

    // == Stats ==
    pub async fn record_evictions(&self, name: &str, count: usize) {
        if count == 0 {
            return;
        }
        let mut caches = self.caches.write().await;
        if let Some(cache) = caches.get_mut(name) {
            cache.stats.record_evictions(count);
        }
    }

    pub async fn stats(&self, name: &str) -> Option<CacheStats> {
        let caches = self.caches.read().await;
        caches.get(name).map(|c| c.stats.clone())
    }

    /// Statistics for every cache, in name order.
    pub async fn all_stats(&self) -> Vec<(String, CacheStats)> {
        let caches = self.caches.read().await;
        caches
            .iter()
            .map(|(name, cache)| (name.clone(), cache.stats.clone()))
            .collect()
    }
}
