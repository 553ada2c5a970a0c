//! Event Scope
//!
//! A host may tear the worker down between events. Each inbound event gets an
//! [`EventScope`]; anything the engine spawns on behalf of that event is
//! registered with it, and the host keeps the worker alive until
//! [`EventScope::settled`] returns.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::warn;

/// Set of background tasks tied to one inbound event.
#[derive(Debug, Clone, Default)]
pub struct EventScope {
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl EventScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawns `task` and keeps the event open until it finishes.
    ///
    /// The task keeps running if the scope handle is dropped.
    pub fn wait_until<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        self.lock().push(handle);
    }

    /// Number of registered tasks that have not finished.
    pub fn pending(&self) -> usize {
        self.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Waits for every registered task, including ones registered while
    /// waiting.
    pub async fn settled(&self) {
        loop {
            let batch: Vec<JoinHandle<()>> = std::mem::take(&mut *self.lock());
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(err) = handle.await {
                    if err.is_panic() {
                        warn!("Background task panicked: {}", err);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_settled_waits_for_all_tasks() {
        let scope = EventScope::new();
        let done = Arc::new(AtomicUsize::new(0));

        for delay in [30u64, 10, 20] {
            let done = done.clone();
            scope.wait_until(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        scope.settled().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(scope.pending(), 0);
    }

    #[tokio::test]
    async fn test_nested_registration_is_awaited() {
        let scope = EventScope::new();
        let done = Arc::new(AtomicUsize::new(0));

        let inner_scope = scope.clone();
        let inner_done = done.clone();
        scope.wait_until(async move {
            inner_scope.wait_until(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                inner_done.fetch_add(1, Ordering::SeqCst);
            });
        });

        scope.settled().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tasks_survive_dropped_scope() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let scope = EventScope::new();
            let done = done.clone();
            scope.wait_until(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_poison_settle() {
        let scope = EventScope::new();
        scope.wait_until(async { panic!("boom") });
        scope.settled().await;
    }
}
