//! Cache Entry Module
//!
//! Defines a stored response and the metadata expiration needs.

use crate::models::Response;

// == Cache Entry ==
/// A response stored under a URL key in one named cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Request URL the response is keyed on
    pub key: String,
    /// The stored response
    pub response: Response,
    /// Insertion timestamp (Unix milliseconds)
    pub inserted_at: u64,
    /// Store-wide write sequence, breaks ties between equal timestamps
    pub sequence: u64,
    /// Precache revision that produced this entry, if any
    pub revision: Option<String>,
}

impl CacheEntry {
    /// Age of the entry in milliseconds at `now_ms`.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.inserted_at)
    }

    /// Lightweight view used when listing a cache.
    pub fn meta(&self) -> EntryMeta {
        EntryMeta {
            key: self.key.clone(),
            inserted_at: self.inserted_at,
            sequence: self.sequence,
        }
    }
}

/// Key and insertion order of an entry, without its response.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryMeta {
    pub key: String,
    pub inserted_at: u64,
    pub sequence: u64,
}

impl EntryMeta {
    /// Oldest-inserted first; the sequence keeps equal timestamps stable.
    pub fn insertion_order(&self) -> (u64, u64, &str) {
        (self.inserted_at, self.sequence, self.key.as_str())
    }
}
