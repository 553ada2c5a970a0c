//! PrecacheMatch
//!
//! Serves manifest URLs from the precache. The installer guarantees every
//! manifest entry is present, so a miss means the install went wrong and is
//! reported instead of papered over with a fetch.

use tracing::error;

use super::StrategyExecutor;
use crate::error::{EngineError, Result};
use crate::models::Response;

impl StrategyExecutor {
    /// Looks up `cache_key` in the precache named `cache_name`.
    pub async fn precache_match(
        &self,
        cache_name: &str,
        cache_key: &str,
        url: &str,
    ) -> Result<Response> {
        match self.storage.match_entry(cache_name, cache_key).await {
            Some(entry) => Ok(entry.response),
            None => {
                error!(cache = %cache_name, key = %cache_key, "Manifest URL missing from precache");
                Err(EngineError::PrecacheMiss(url.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::test_support::ScriptedNetwork;
    use super::super::StrategyExecutor;
    use crate::cache::{CacheStorage, ManualClock};
    use crate::error::EngineError;
    use crate::models::Response;

    #[tokio::test]
    async fn test_hit_and_miss() {
        let network = Arc::new(ScriptedNetwork::default());
        network.serve("https://app.test/app.js", "from network");
        let storage = CacheStorage::new(Arc::new(ManualClock::new(0)));
        storage
            .put("precache-v1-abc", "https://app.test/app.js", Response::ok("js"), None)
            .await;
        let executor = StrategyExecutor::new(storage, network.clone());

        let hit = executor
            .precache_match("precache-v1-abc", "https://app.test/app.js", "https://app.test/app.js")
            .await
            .unwrap();
        assert_eq!(hit.body, "js");

        let miss = executor
            .precache_match("precache-v1-abc", "https://app.test/app.css", "https://app.test/app.css")
            .await;
        assert!(matches!(miss, Err(EngineError::PrecacheMiss(_))));
        assert_eq!(network.calls(), 0);
    }
}
