//! Worker
//!
//! One deployed worker version: the configuration, the shared cache store,
//! the router and the lifecycle controller, wired together once at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::cache::{CacheStorage, ExpirationPolicy};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::lifecycle::{ActivationReport, LifecycleController, LifecycleState, WorkerHost};
use crate::models::{CacheSummary, ClientMessage, Request, Response, VersionReply};
use crate::network::{FetchError, Network, PreloadResponse};
use crate::precache::{InstallReport, PrecacheManager};
use crate::routing::{FetchEvent, Router};
use crate::strategies::StrategyExecutor;
use crate::tasks::EventScope;

pub struct Worker {
    config: Arc<EngineConfig>,
    storage: CacheStorage,
    network: Arc<dyn Network>,
    router: Router,
    lifecycle: Arc<LifecycleController>,
}

impl Worker {
    // == Constructor ==
    /// Validates the configuration and builds every component.
    pub fn new(
        config: EngineConfig,
        storage: CacheStorage,
        network: Arc<dyn Network>,
        host: Arc<dyn WorkerHost>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let executor = StrategyExecutor::new(storage.clone(), network.clone());
        let precache = PrecacheManager::new(config.clone(), storage.clone(), network.clone());
        let router = Router::new(&config, executor, precache.clone())?;
        let lifecycle = Arc::new(LifecycleController::new(
            config.clone(),
            storage.clone(),
            precache,
            host,
        ));

        info!(
            version = %config.version,
            routes = router.routes().len(),
            manifest = config.manifest.len(),
            "Worker ready"
        );
        Ok(Self {
            config,
            storage,
            network,
            router,
            lifecycle,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleController> {
        &self.lifecycle
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Cache names with an expiration policy, for the periodic sweep.
    /// When several routes share a cache the first route's policy applies.
    pub fn expiration_targets(&self) -> Vec<(String, ExpirationPolicy)> {
        let mut targets = BTreeMap::new();
        for route in self.router.routes() {
            if let Some(policy) = route.expiration() {
                targets
                    .entry(route.cache_name().to_string())
                    .or_insert(policy);
            }
        }
        targets.into_iter().collect()
    }

    // == Events ==
    /// Resolves an intercepted request. Navigations get a preload fetch
    /// started alongside routing when enabled.
    ///
    /// Until this instance is `Activated` it does not control pages: every
    /// request goes straight to the network and nothing is cached.
    pub async fn fetch(&self, request: Request, scope: &EventScope) -> Result<Response> {
        let state = self.state();
        if state != LifecycleState::Activated {
            debug!(url = %request.url, %state, "Not activated, passing request through");
            return self.router.pass_through(&request, None).await;
        }

        let mut event = FetchEvent::new(request).with_scope(scope.clone());
        if self.router.should_preload(&event.request) {
            let preload = self.start_preload(&event.request);
            event = event.with_preload(preload);
        }
        self.router.resolve(event).await
    }

    fn start_preload(&self, request: &Request) -> PreloadResponse {
        let network = self.network.clone();
        let request = request.clone();
        let preload = tokio::spawn(async move { network.fetch(&request).await.map(Some) });
        async move {
            preload
                .await
                .map_err(|e| FetchError::Transport(format!("preload task failed: {e}")))?
        }
        .boxed()
    }

    pub async fn install(&self) -> Result<InstallReport> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivationReport> {
        self.lifecycle.activate().await
    }

    /// Handles a page message. Returns the reply for `GET_VERSION`.
    pub async fn message(
        &self,
        payload: serde_json::Value,
        scope: &EventScope,
    ) -> Option<VersionReply> {
        let message = ClientMessage::from_value(payload);
        if message != ClientMessage::GetVersion {
            self.lifecycle.handle_message(message, None, scope);
            return None;
        }

        let (reply, answer) = oneshot::channel();
        self.lifecycle.handle_message(message, Some(reply), scope);
        answer.await.ok()
    }

    /// Per-cache statistics in name order.
    pub async fn cache_summaries(&self) -> Vec<CacheSummary> {
        self.storage
            .all_stats()
            .await
            .iter()
            .map(|(name, stats)| CacheSummary::new(name.clone(), stats))
            .collect()
    }
}
