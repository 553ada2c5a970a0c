//! NetworkFirst
//!
//! The network answer wins whenever there is one; the cache is only a
//! fallback. Navigations consume the host's preload response in place of a
//! second fetch.

use std::sync::Arc;

use tokio::task::JoinError;
use tracing::{debug, warn};

use super::{not_available, store_in_background, StrategyExecutor, StrategyOptions};
use crate::error::Result;
use crate::models::{Request, Response};
use crate::network::{FetchError, Network, PreloadResponse};
use crate::tasks::EventScope;

impl StrategyExecutor {
    pub(super) async fn network_first(
        &self,
        request: &Request,
        options: &StrategyOptions,
        preload: Option<PreloadResponse>,
        scope: &EventScope,
    ) -> Result<Response> {
        let outcome = match options.network_timeout {
            None => network_leg(self.network.clone(), request.clone(), preload).await,
            Some(timeout) => {
                let mut leg = tokio::spawn(network_leg(
                    self.network.clone(),
                    request.clone(),
                    preload,
                ));

                match tokio::time::timeout(timeout, &mut leg).await {
                    Ok(joined) => flatten(joined),
                    Err(_) => {
                        if let Some(entry) = self.cached(request, options, scope).await {
                            debug!(url = %request.url, ?timeout, "Network too slow, serving cached response");
                            let storage = self.storage.clone();
                            let request = request.clone();
                            let options = options.clone();
                            let refresh_scope = scope.clone();
                            scope.wait_until(async move {
                                if let Ok(response) = flatten(leg.await) {
                                    store_in_background(
                                        &storage,
                                        &request,
                                        &response,
                                        &options,
                                        &refresh_scope,
                                    );
                                }
                            });
                            return Ok(entry.response);
                        }
                        flatten(leg.await)
                    }
                }
            }
        };

        match outcome {
            Ok(response) => {
                self.store_in_background(request, &response, options, scope);
                Ok(response)
            }
            Err(err) => {
                warn!(url = %request.url, cache = %options.cache_name, "Network failed, trying cache: {}", err);
                match self.cached(request, options, scope).await {
                    Some(entry) => Ok(entry.response),
                    None => Err(not_available(request)),
                }
            }
        }
    }
}

/// Uses the preload response when the host has one, otherwise fetches.
async fn network_leg(
    network: Arc<dyn Network>,
    request: Request,
    preload: Option<PreloadResponse>,
) -> std::result::Result<Response, FetchError> {
    if let Some(preload) = preload {
        if let Some(response) = preload.await? {
            debug!(url = %request.url, "Using navigation preload response");
            return Ok(response);
        }
    }
    network.fetch(&request).await
}

fn flatten(
    joined: std::result::Result<std::result::Result<Response, FetchError>, JoinError>,
) -> std::result::Result<Response, FetchError> {
    joined.map_err(|e| FetchError::Transport(format!("fetch task failed: {e}")))?
}
