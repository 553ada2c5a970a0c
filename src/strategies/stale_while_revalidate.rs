//! StaleWhileRevalidate
//!
//! A cached response is returned at once while a network fetch started
//! alongside the lookup refreshes the cache. The refresh is best-effort:
//! nobody waits on it, so its failures are only logged.

use tracing::{debug, warn};

use super::{not_available, store_in_background, StrategyExecutor, StrategyOptions};
use crate::error::Result;
use crate::models::{Request, Response};
use crate::tasks::EventScope;

impl StrategyExecutor {
    pub(super) async fn stale_while_revalidate(
        &self,
        request: &Request,
        options: &StrategyOptions,
        scope: &EventScope,
    ) -> Result<Response> {
        let network = self.network.clone();
        let fetch_request = request.clone();
        let refresh = tokio::spawn(async move { network.fetch(&fetch_request).await });

        match self.cached(request, options, scope).await {
            Some(entry) => {
                let storage = self.storage.clone();
                let request = request.clone();
                let options = options.clone();
                let refresh_scope = scope.clone();
                scope.wait_until(async move {
                    match refresh.await {
                        Ok(Ok(response)) => {
                            store_in_background(&storage, &request, &response, &options, &refresh_scope);
                        }
                        Ok(Err(err)) => {
                            debug!(url = %request.url, "Background refresh failed: {}", err);
                        }
                        Err(err) => {
                            warn!(url = %request.url, "Background refresh task failed: {}", err);
                        }
                    }
                });
                Ok(entry.response)
            }
            None => match refresh.await {
                Ok(Ok(response)) => {
                    self.store_in_background(request, &response, options, scope);
                    Ok(response)
                }
                Ok(Err(err)) => {
                    warn!(url = %request.url, cache = %options.cache_name, "Cache miss and network failed: {}", err);
                    Err(not_available(request))
                }
                Err(err) => {
                    warn!(url = %request.url, "Fetch task failed: {}", err);
                    Err(not_available(request))
                }
            },
        }
    }
}
