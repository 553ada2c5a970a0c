//! Lifecycle Controller
//!
//! Drives `Installing -> Waiting -> Activating -> Activated` and answers the
//! messages pages post to the worker.
//!
//! Activation can be requested two ways: by install itself when no open page
//! is still controlled by an older instance, or by a page sending
//! `SKIP_WAITING`. The host decides when activation actually happens; the
//! skip-wait handshake bounds how long the worker waits for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::cache::CacheStorage;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::lifecycle::{LifecycleState, WorkerHost};
use crate::models::{ClientMessage, VersionReply};
use crate::precache::{InstallReport, PrecacheManager};
use crate::tasks::EventScope;

/// How a skip-wait handshake ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipWaitOutcome {
    /// The first request settled before the timer fired
    Settled,
    /// The timer fired; one more request was made
    Retried { retry_settled: bool },
}

/// Result of a completed activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Caches removed by cleanup
    pub deleted: Vec<String>,
    /// Open pages at activation time
    pub clients: Vec<String>,
}

// == Lifecycle Controller ==
pub struct LifecycleController {
    config: Arc<EngineConfig>,
    storage: CacheStorage,
    precache: PrecacheManager,
    host: Arc<dyn WorkerHost>,
    state: watch::Sender<LifecycleState>,
    skip_requested: AtomicBool,
}

impl LifecycleController {
    pub fn new(
        config: Arc<EngineConfig>,
        storage: CacheStorage,
        precache: PrecacheManager,
        host: Arc<dyn WorkerHost>,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Installing);
        Self {
            config,
            storage,
            precache,
            host,
            state,
            skip_requested: AtomicBool::new(false),
        }
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Moves to `to` if the current state allows it.
    fn transition(&self, to: LifecycleState) -> Result<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|current| {
            if current.can_move_to(to) {
                let changed = *current != to;
                *current = to;
                changed
            } else {
                outcome = Err(EngineError::InvalidState { from: *current, to });
                false
            }
        });
        outcome
    }

    // == Install ==
    /// Installs the precache and moves to `Waiting`.
    ///
    /// On failure the instance stays `Installing` and whatever version is
    /// active keeps serving.
    pub async fn install(&self) -> Result<InstallReport> {
        let current = self.state();
        if current != LifecycleState::Installing {
            return Err(EngineError::InvalidState {
                from: current,
                to: LifecycleState::Waiting,
            });
        }

        info!(version = %self.version(), "Installing");
        let report = match self.precache.install().await {
            Ok(report) => report,
            Err(err) => {
                error!(version = %self.version(), "Install failed, previous version stays active: {}", err);
                return Err(err);
            }
        };
        self.transition(LifecycleState::Waiting)?;

        if self.skip_requested.load(Ordering::SeqCst) || !self.older_clients_open().await {
            match self.skip_waiting().await {
                Ok(outcome) => debug!(?outcome, "Requested activation after install"),
                Err(err) => warn!(version = %self.version(), "Could not request activation: {}", err),
            }
        }
        Ok(report)
    }

    async fn older_clients_open(&self) -> bool {
        match self.host.match_clients(false).await {
            Ok(clients) => !clients.is_empty(),
            Err(err) => {
                warn!("Could not list clients, staying in waiting: {}", err);
                true
            }
        }
    }

    // == Activate ==
    /// Cleans up caches, claims open pages, and moves to `Activated`.
    pub async fn activate(&self) -> Result<ActivationReport> {
        self.transition(LifecycleState::Activating)?;

        let clients: Vec<String> = self
            .host
            .match_clients(true)
            .await?
            .into_iter()
            .map(|client| client.url)
            .collect();
        info!(version = %self.version(), clients = ?clients, "Activating");

        let deleted = self.cleanup_caches().await;
        self.host.claim_clients().await?;
        self.transition(LifecycleState::Activated)?;

        info!(version = %self.version(), deleted = deleted.len(), "Activated");
        Ok(ActivationReport { deleted, clients })
    }

    /// Deletes every cache that is neither allow-listed nor under the
    /// current precache prefix. Returns the deleted names in order.
    pub async fn cleanup_caches(&self) -> Vec<String> {
        let mut deleted = Vec::new();

        for name in self.storage.names().await {
            if self.retains(&name) {
                continue;
            }
            if self.storage.delete_cache(&name).await {
                deleted.push(name);
            }
        }

        if !deleted.is_empty() {
            info!(version = %self.version(), deleted = ?deleted, "Deleted stale caches");
        }
        deleted
    }

    fn retains(&self, name: &str) -> bool {
        self.config.keep_caches.iter().any(|keep| keep == name)
            || name.starts_with(&self.config.precache_prefix)
    }

    // == Skip-wait handshake ==
    /// Asks the host to activate this instance, waiting at most the
    /// configured timeout. If that runs out, the request is repeated exactly
    /// once under the same bound.
    pub async fn skip_waiting(&self) -> Result<SkipWaitOutcome> {
        self.skip_requested.store(true, Ordering::SeqCst);
        let timeout = self.config.skip_wait_timeout();

        match tokio::time::timeout(timeout, self.host.skip_waiting()).await {
            Ok(settled) => {
                settled?;
                Ok(SkipWaitOutcome::Settled)
            }
            Err(_) => {
                warn!(version = %self.version(), "{}, retrying once", EngineError::ActivationTimeout(timeout));
                let retry_settled = match tokio::time::timeout(timeout, self.host.skip_waiting()).await {
                    Ok(Ok(())) => true,
                    Ok(Err(err)) => {
                        warn!(version = %self.version(), "Skip waiting retry failed: {}", err);
                        false
                    }
                    Err(_) => {
                        warn!(version = %self.version(), "Skip waiting retry did not settle within {:?}", timeout);
                        false
                    }
                };
                Ok(SkipWaitOutcome::Retried { retry_settled })
            }
        }
    }

    /// Takes control of open pages regardless of lifecycle state.
    pub async fn claim(&self) -> Result<()> {
        self.host.claim_clients().await?;
        info!(version = %self.version(), "Claimed clients");
        Ok(())
    }

    // == Messages ==
    /// Handles a message posted by a page.
    ///
    /// `GET_VERSION` is answered on `reply` right away; skip-wait and claim
    /// run as tasks registered with `scope`. Unknown messages are ignored.
    pub fn handle_message(
        self: &Arc<Self>,
        message: ClientMessage,
        reply: Option<oneshot::Sender<VersionReply>>,
        scope: &EventScope,
    ) {
        match message {
            ClientMessage::SkipWaiting => {
                let controller = Arc::clone(self);
                scope.wait_until(async move {
                    match controller.skip_waiting().await {
                        Ok(outcome) => debug!(?outcome, "Skip waiting handshake finished"),
                        Err(err) => warn!("Skip waiting failed: {}", err),
                    }
                });
            }
            ClientMessage::GetVersion => match reply {
                Some(reply) => {
                    let version = VersionReply {
                        version: self.config.version.clone(),
                    };
                    if reply.send(version).is_err() {
                        debug!("Version requester went away");
                    }
                }
                None => debug!("GET_VERSION without a reply channel"),
            },
            ClientMessage::ClaimClients => {
                let controller = Arc::clone(self);
                scope.wait_until(async move {
                    if let Err(err) = controller.claim().await {
                        warn!("Claim failed: {}", err);
                    }
                });
            }
            ClientMessage::Unknown => debug!("Ignoring unknown message"),
        }
    }
}
