//! Expiration Sweep Task
//!
//! Expiration normally runs after writes. A cache nobody writes to would keep
//! its old entries forever, so this task applies every configured policy on
//! a fixed interval as well.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheStorage, ExpirationPolicy};

/// Spawns a task that applies each `(cache name, policy)` pair every
/// `interval_secs` seconds.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted by the binary on shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_expiration_sweep(storage.clone(), worker.expiration_targets(), 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_expiration_sweep(
    storage: CacheStorage,
    targets: Vec<(String, ExpirationPolicy)>,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            caches = targets.len(),
            "Starting expiration sweep with interval of {} seconds", interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let mut removed = 0;
            for (cache_name, policy) in &targets {
                removed += policy.apply(&storage, cache_name).await.removed();
            }

            if removed > 0 {
                info!("Expiration sweep: removed {} entries", removed);
            } else {
                debug!("Expiration sweep: nothing to remove");
            }
        }
    })
}
