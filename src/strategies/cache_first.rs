//! CacheFirst
//!
//! A cached response is returned without touching the network. On a miss
//! the network response is returned and stored.

use tracing::warn;

use super::{not_available, StrategyExecutor, StrategyOptions};
use crate::error::Result;
use crate::models::{Request, Response};
use crate::tasks::EventScope;

impl StrategyExecutor {
    pub(super) async fn cache_first(
        &self,
        request: &Request,
        options: &StrategyOptions,
        scope: &EventScope,
    ) -> Result<Response> {
        if let Some(entry) = self.cached(request, options, scope).await {
            return Ok(entry.response);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_in_background(request, &response, options, scope);
                Ok(response)
            }
            Err(err) => {
                warn!(url = %request.url, cache = %options.cache_name, "Cache miss and network failed: {}", err);
                Err(not_available(request))
            }
        }
    }
}
