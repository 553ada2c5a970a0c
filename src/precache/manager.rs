//! Precache installer
//!
//! Populates the current version's precache, reusing whatever an earlier
//! installation already downloaded. The installer never deletes caches;
//! retiring previous installations is left to activation cleanup.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::cache::CacheStorage;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{Request, Response};
use crate::network::Network;
use crate::precache::{ManifestEntry, PrecacheManifest};

/// What one install run did with each manifest key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Downloaded from the network
    pub fetched: Vec<String>,
    /// Copied from a previous installation with the same revision
    pub copied: Vec<String>,
    /// Already present in the current precache
    pub reused: Vec<String>,
    /// Keys of previous installations no longer in the manifest
    pub stale: Vec<String>,
}

// == Precache Manager ==
#[derive(Clone)]
pub struct PrecacheManager {
    config: Arc<EngineConfig>,
    storage: CacheStorage,
    network: Arc<dyn Network>,
}

impl PrecacheManager {
    pub fn new(config: Arc<EngineConfig>, storage: CacheStorage, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            storage,
            network,
        }
    }

    /// Name of the cache this version installs into.
    pub fn cache_name(&self) -> String {
        self.config.precache_cache_name()
    }

    pub fn manifest(&self) -> &PrecacheManifest {
        &self.config.manifest
    }

    /// Cache key serving `url`, if the manifest covers it.
    pub fn lookup_key(&self, url: &str) -> Option<String> {
        self.config.manifest.lookup(url)
    }

    /// Earlier installations present in storage, in name order.
    pub async fn previous_caches(&self) -> Vec<String> {
        let current = self.cache_name();
        self.storage
            .names()
            .await
            .into_iter()
            .filter(|name| name.starts_with(&self.config.precache_family) && *name != current)
            .collect()
    }

    // == Install ==
    /// Makes the current precache hold every manifest entry.
    ///
    /// Entries already present with the same revision are left alone, entries
    /// a previous installation holds with the same revision are copied, and
    /// the rest are fetched with bounded concurrency. Any failed fetch fails
    /// the whole install; successful downloads stay in the cache so a retry
    /// does not repeat them.
    pub async fn install(&self) -> Result<InstallReport> {
        let cache_name = self.cache_name();
        let previous = self.previous_caches().await;
        self.storage.open(&cache_name).await;

        let mut report = InstallReport::default();
        let mut to_fetch = Vec::new();

        for entry in self.manifest().entries() {
            let key = entry.cache_key();
            if self.holds_revision(&cache_name, &key, entry).await {
                report.reused.push(key);
                continue;
            }

            match self.find_in_previous(&previous, &key, entry).await {
                Some(response) => {
                    self.storage
                        .put(&cache_name, &key, response, entry.revision.clone())
                        .await;
                    report.copied.push(key);
                }
                None => to_fetch.push(entry.clone()),
            }
        }

        let results: Vec<std::result::Result<String, (String, String)>> = stream::iter(to_fetch)
            .map(|entry| self.fetch_entry(&cache_name, entry))
            .buffer_unordered(self.config.install_concurrency.max(1))
            .collect()
            .await;

        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(key) => report.fetched.push(key),
                Err(failure) => failures.push(failure),
            }
        }

        if !failures.is_empty() {
            failures.sort();
            let reason = failures[0].1.clone();
            let failed: Vec<String> = failures.into_iter().map(|(url, _)| url).collect();
            error!(
                version = %self.config.version,
                cache = %cache_name,
                failed = failed.len(),
                reason = %reason,
                "Precache install failed"
            );
            return Err(EngineError::InstallFailed { failed, reason });
        }

        report.fetched.sort();
        report.stale = self.stale_keys(&previous).await;

        info!(
            version = %self.config.version,
            cache = %cache_name,
            fetched = report.fetched.len(),
            copied = report.copied.len(),
            reused = report.reused.len(),
            stale = report.stale.len(),
            "Precache installed"
        );
        Ok(report)
    }

    async fn holds_revision(&self, cache: &str, key: &str, entry: &ManifestEntry) -> bool {
        match self.storage.peek(cache, key).await {
            Some(existing) => existing.revision == entry.revision,
            None => false,
        }
    }

    async fn find_in_previous(
        &self,
        previous: &[String],
        key: &str,
        entry: &ManifestEntry,
    ) -> Option<Response> {
        for cache in previous {
            if let Some(found) = self.storage.peek(cache, key).await {
                if found.revision == entry.revision {
                    debug!(from = %cache, key = %key, "Reusing precached entry");
                    return Some(found.response);
                }
            }
        }
        None
    }

    /// Downloads one entry into the precache. Errors carry `(url, reason)`.
    async fn fetch_entry(
        &self,
        cache_name: &str,
        entry: ManifestEntry,
    ) -> std::result::Result<String, (String, String)> {
        let response = self
            .network
            .fetch(&Request::get(entry.url.clone()))
            .await
            .map_err(|e| (entry.url.clone(), e.to_string()))?;

        if !response.is_cacheable() {
            return Err((
                entry.url.clone(),
                format!("unexpected status {}", response.status),
            ));
        }

        let key = entry.cache_key();
        self.storage
            .put(cache_name, &key, response, entry.revision)
            .await;
        Ok(key)
    }

    async fn stale_keys(&self, previous: &[String]) -> Vec<String> {
        let mut stale = BTreeSet::new();
        for cache in previous {
            for key in self.storage.keys(cache).await {
                if !self.manifest().contains_key(&key) {
                    stale.insert(key);
                }
            }
        }
        stale.into_iter().collect()
    }
}
