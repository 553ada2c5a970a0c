//! Router
//!
//! Resolution order for an intercepted request:
//! 1. manifest URLs are served from the precache,
//! 2. bypassed URLs go straight to the network,
//! 3. the first matching route runs its strategy,
//! 4. anything else passes through to the network uncached.

use regex::Regex;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{Request, Response};
use crate::network::PreloadResponse;
use crate::precache::PrecacheManager;
use crate::routing::matcher::compile_patterns;
use crate::routing::Route;
use crate::strategies::StrategyExecutor;
use crate::tasks::EventScope;

/// An intercepted request as delivered by the host.
pub struct FetchEvent {
    pub request: Request,
    /// Navigation preload started by the host, if any
    pub preload: Option<PreloadResponse>,
    /// Scope background work for this request is registered with
    pub scope: EventScope,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            preload: None,
            scope: EventScope::new(),
        }
    }

    pub fn with_preload(mut self, preload: PreloadResponse) -> Self {
        self.preload = Some(preload);
        self
    }

    pub fn with_scope(mut self, scope: EventScope) -> Self {
        self.scope = scope;
        self
    }
}

// == Router ==
pub struct Router {
    executor: StrategyExecutor,
    precache: PrecacheManager,
    routes: Vec<Route>,
    bypass: Vec<Regex>,
    navigation_preload: bool,
}

impl Router {
    /// Compiles the configured routes and bypass patterns.
    pub fn new(
        config: &EngineConfig,
        executor: StrategyExecutor,
        precache: PrecacheManager,
    ) -> Result<Self> {
        let routes = config
            .routes
            .iter()
            .map(Route::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            executor,
            precache,
            routes,
            bypass: compile_patterns(&config.bypass)?,
            navigation_preload: config.navigation_preload,
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_bypassed(&self, url: &str) -> bool {
        self.bypass.iter().any(|re| re.is_match(url))
    }

    /// Whether the host should start a preload fetch for this request.
    pub fn should_preload(&self, request: &Request) -> bool {
        self.navigation_preload && request.is_navigation() && !self.is_bypassed(&request.url)
    }

    // == Resolve ==
    pub async fn resolve(&self, event: FetchEvent) -> Result<Response> {
        let FetchEvent {
            request,
            preload,
            scope,
        } = event;

        if request.is_get() {
            if let Some(key) = self.precache.lookup_key(&request.url) {
                debug!(url = %request.url, key = %key, "Serving from precache");
                return self
                    .executor
                    .precache_match(&self.precache.cache_name(), &key, &request.url)
                    .await;
            }
        }

        if self.is_bypassed(&request.url) {
            debug!(url = %request.url, "Bypassing cache");
            return self.pass_through(&request, None).await;
        }

        if let Some(route) = self.routes.iter().find(|route| route.matches(&request)) {
            return self
                .executor
                .serve(route.strategy(), &request, route.options(), preload, &scope)
                .await;
        }

        self.pass_through(&request, preload).await
    }

    /// Network only, nothing is cached.
    pub(crate) async fn pass_through(
        &self,
        request: &Request,
        preload: Option<PreloadResponse>,
    ) -> Result<Response> {
        if let Some(preload) = preload {
            match preload.await {
                Ok(Some(response)) => return Ok(response),
                Ok(None) => {}
                Err(err) => {
                    warn!(url = %request.url, "Preload failed: {}", err);
                    return Err(EngineError::NotAvailable(request.url.clone()));
                }
            }
        }

        self.executor.network().fetch(request).await.map_err(|err| {
            warn!(url = %request.url, "Network request failed: {}", err);
            EngineError::NotAvailable(request.url.clone())
        })
    }
}
