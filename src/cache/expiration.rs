//! Expiration Policy Module
//!
//! Count and age limits applied to a named cache after writes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CacheEntry, CacheStorage, MILLIS_PER_SECOND};

// == Expiration Policy ==
/// Per-cache eviction limits. Either limit may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationPolicy {
    /// Keep at most this many entries, newest first
    #[serde(default)]
    pub max_entries: Option<usize>,
    /// Drop entries older than this
    #[serde(default)]
    pub max_age_seconds: Option<u64>,
}

/// Keys removed by one policy application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpirationReport {
    /// Removed for exceeding the age limit
    pub expired: Vec<String>,
    /// Removed for exceeding the count limit, oldest first
    pub evicted: Vec<String>,
}

impl ExpirationReport {
    pub fn removed(&self) -> usize {
        self.expired.len() + self.evicted.len()
    }
}

impl ExpirationPolicy {
    pub fn new(max_entries: Option<usize>, max_age_seconds: Option<u64>) -> Self {
        Self {
            max_entries,
            max_age_seconds,
        }
    }

    /// True when neither limit is set.
    pub fn is_unbounded(&self) -> bool {
        self.max_entries.is_none() && self.max_age_seconds.is_none()
    }

    /// An entry is expired once it is strictly older than `max_age_seconds`.
    pub fn is_expired(&self, inserted_at: u64, now_ms: u64) -> bool {
        match self.max_age_seconds {
            Some(max_age) => {
                now_ms.saturating_sub(inserted_at) > max_age.saturating_mul(MILLIS_PER_SECOND)
            }
            None => false,
        }
    }

    /// Whether a cached entry may still be served.
    pub fn is_fresh(&self, entry: &CacheEntry, now_ms: u64) -> bool {
        !self.is_expired(entry.inserted_at, now_ms)
    }

    // == Apply ==
    /// Prunes `cache_name` down to the policy limits.
    ///
    /// Entries past the age limit go first; if the cache still holds more than
    /// `max_entries`, the oldest-inserted are removed until it fits. The
    /// listing is a snapshot, so entries that vanish before their delete are
    /// skipped and entries written meanwhile are left for the next run.
    pub async fn apply(&self, storage: &CacheStorage, cache_name: &str) -> ExpirationReport {
        let mut report = ExpirationReport::default();
        if self.is_unbounded() {
            return report;
        }

        let now = storage.now_ms();
        let mut entries = storage.entries(cache_name).await;
        entries.sort_by(|a, b| a.insertion_order().cmp(&b.insertion_order()));

        let mut remaining = Vec::with_capacity(entries.len());
        for meta in entries {
            if self.is_expired(meta.inserted_at, now) {
                if storage.delete(cache_name, &meta.key).await {
                    report.expired.push(meta.key);
                }
            } else {
                remaining.push(meta);
            }
        }

        if let Some(max_entries) = self.max_entries {
            let overflow = remaining.len().saturating_sub(max_entries);
            for meta in remaining.into_iter().take(overflow) {
                if storage.delete(cache_name, &meta.key).await {
                    report.evicted.push(meta.key);
                }
            }
        }

        storage.record_evictions(cache_name, report.removed()).await;
        if report.removed() > 0 {
            debug!(
                cache = %cache_name,
                expired = report.expired.len(),
                evicted = report.evicted.len(),
                "Expiration removed entries"
            );
        }
        report
    }
}
