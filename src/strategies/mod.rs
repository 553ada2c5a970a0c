//! Strategies Module
//!
//! Algorithms that produce a response for a request from a named cache, the
//! network, or both.
//!
//! Every strategy shares the same write path: a cacheable network response
//! is written in a background task registered with the request's
//! [`EventScope`], and the route's [`PostWriteHook`]s run after the write
//! completes. The caller gets its response without waiting for either.

mod cache_first;
mod network_first;
mod precache_match;
mod stale_while_revalidate;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CacheEntry, CacheStorage, ExpirationPolicy};
use crate::error::{EngineError, Result};
use crate::models::{Request, Response};
use crate::network::{Network, PreloadResponse};
use crate::tasks::EventScope;

// == Strategy Kind ==
/// Caching algorithm bound to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Serve from cache; fetch and store only on a miss
    CacheFirst,
    /// Fetch first; fall back to cache when the network fails
    NetworkFirst,
    /// Serve from cache immediately and refresh it in the background
    StaleWhileRevalidate,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StrategyKind::CacheFirst => "cache-first",
            StrategyKind::NetworkFirst => "network-first",
            StrategyKind::StaleWhileRevalidate => "stale-while-revalidate",
        };
        f.write_str(name)
    }
}

// == Post-write hooks ==
/// Work run after every successful cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostWriteHook {
    Expiration(ExpirationPolicy),
}

/// Cache settings a strategy runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOptions {
    /// Cache the strategy reads and writes
    pub cache_name: String,
    /// Hooks run after each write, in order
    pub hooks: Vec<PostWriteHook>,
    /// NetworkFirst only: stop waiting for the network after this long when
    /// a cached response is available
    pub network_timeout: Option<Duration>,
}

impl StrategyOptions {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            hooks: Vec::new(),
            network_timeout: None,
        }
    }

    pub fn with_expiration(mut self, policy: ExpirationPolicy) -> Self {
        self.hooks.push(PostWriteHook::Expiration(policy));
        self
    }

    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    pub fn expiration_policies(&self) -> impl Iterator<Item = &ExpirationPolicy> {
        self.hooks.iter().map(|hook| match hook {
            PostWriteHook::Expiration(policy) => policy,
        })
    }
}

/// Cache key for a request URL: the URL without its fragment.
pub fn cache_key(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

// == Strategy Executor ==
/// Runs strategies against the shared store and network.
#[derive(Clone)]
pub struct StrategyExecutor {
    storage: CacheStorage,
    network: Arc<dyn Network>,
}

impl StrategyExecutor {
    pub fn new(storage: CacheStorage, network: Arc<dyn Network>) -> Self {
        Self { storage, network }
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    /// Produces a response for `request` with the given strategy.
    ///
    /// `preload` is only consumed by NetworkFirst.
    pub async fn serve(
        &self,
        kind: StrategyKind,
        request: &Request,
        options: &StrategyOptions,
        preload: Option<PreloadResponse>,
        scope: &EventScope,
    ) -> Result<Response> {
        debug!(strategy = %kind, cache = %options.cache_name, url = %request.url, "Serving request");
        match kind {
            StrategyKind::CacheFirst => self.cache_first(request, options, scope).await,
            StrategyKind::NetworkFirst => {
                self.network_first(request, options, preload, scope).await
            }
            StrategyKind::StaleWhileRevalidate => {
                self.stale_while_revalidate(request, options, scope).await
            }
        }
    }

    /// Reads a usable entry, ignoring ones the route's policy has expired.
    async fn cached(
        &self,
        request: &Request,
        options: &StrategyOptions,
        scope: &EventScope,
    ) -> Option<CacheEntry> {
        let key = cache_key(&request.url);
        let entry = self.storage.match_entry(&options.cache_name, key).await?;
        let now = self.storage.now_ms();

        if options.expiration_policies().all(|p| p.is_fresh(&entry, now)) {
            return Some(entry);
        }

        debug!(cache = %options.cache_name, url = %key, "Ignoring expired cache entry");
        let storage = self.storage.clone();
        let options = options.clone();
        scope.wait_until(async move {
            run_hooks(&storage, &options).await;
        });
        None
    }

    /// Writes a cacheable response in the background, then runs the hooks.
    fn store_in_background(
        &self,
        request: &Request,
        response: &Response,
        options: &StrategyOptions,
        scope: &EventScope,
    ) {
        store_in_background(&self.storage, request, response, options, scope);
    }
}

pub(crate) fn store_in_background(
    storage: &CacheStorage,
    request: &Request,
    response: &Response,
    options: &StrategyOptions,
    scope: &EventScope,
) {
    if !response.is_cacheable() {
        debug!(url = %request.url, status = response.status, "Not caching response");
        return;
    }

    let storage = storage.clone();
    let key = cache_key(&request.url).to_string();
    let response = response.clone();
    let options = options.clone();
    scope.wait_until(async move {
        storage
            .put(&options.cache_name, &key, response, None)
            .await;
        run_hooks(&storage, &options).await;
    });
}

async fn run_hooks(storage: &CacheStorage, options: &StrategyOptions) {
    for policy in options.expiration_policies() {
        policy.apply(storage, &options.cache_name).await;
    }
}

fn not_available(request: &Request) -> EngineError {
    EngineError::NotAvailable(request.url.clone())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::models::{Request, Response};
    use crate::network::{FetchError, Network};

    /// Scripted network: fixed responses per URL, optional delay, call count.
    #[derive(Debug, Default)]
    pub struct ScriptedNetwork {
        pub responses: Mutex<HashMap<String, Response>>,
        pub delay: Mutex<Option<Duration>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedNetwork {
        pub fn serve(&self, url: &str, body: &str) {
            self.respond(url, Response::ok(body.to_string()));
        }

        pub fn respond(&self, url: &str, response: Response) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), response);
        }

        pub fn go_offline(&self) {
            self.responses.lock().unwrap().clear();
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Network for ScriptedNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .lock()
                .unwrap()
                .get(&request.url)
                .cloned()
                .ok_or_else(|| FetchError::Transport("offline".to_string()))
        }
    }
}
