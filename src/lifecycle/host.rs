//! Host runtime boundary
//!
//! The engine never talks to pages directly. Activation, client claim and
//! client listing go through [`WorkerHost`], implemented by whatever runtime
//! delivers events to the worker.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::lifecycle::{LifecycleController, LifecycleState};

const ACTIVATION_QUEUE: usize = 16;

/// Failure reported by the host runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl From<HostError> for EngineError {
    fn from(err: HostError) -> Self {
        EngineError::Host(err.0)
    }
}

/// An open page of the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub url: String,
    /// Controlled by another (older) worker instance
    pub controlled: bool,
}

impl ClientInfo {
    pub fn new(url: impl Into<String>, controlled: bool) -> Self {
        Self {
            url: url.into(),
            controlled,
        }
    }
}

/// Operations the engine asks of its host runtime.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Asks for this instance to be activated now. Resolves once the host
    /// has acted on it, which may never happen.
    async fn skip_waiting(&self) -> Result<(), HostError>;

    /// Takes control of every open page of the origin.
    async fn claim_clients(&self) -> Result<(), HostError>;

    /// Lists open pages; without `include_uncontrolled` only pages controlled
    /// by another instance are returned.
    async fn match_clients(&self, include_uncontrolled: bool)
        -> Result<Vec<ClientInfo>, HostError>;
}

// == Standalone Host ==
/// Skip-wait request forwarded to the activation listener.
#[derive(Debug)]
pub struct ActivationRequest {
    pub done: oneshot::Sender<()>,
}

/// Host for the standalone binary: activation requests are queued to a
/// listener task, clients are whatever the binding registered.
#[derive(Debug)]
pub struct StandaloneHost {
    activation: mpsc::Sender<ActivationRequest>,
    clients: RwLock<Vec<ClientInfo>>,
}

impl StandaloneHost {
    /// Creates the host and the receiving end for [`spawn_activation_listener`].
    pub fn new() -> (Self, mpsc::Receiver<ActivationRequest>) {
        let (activation, requests) = mpsc::channel(ACTIVATION_QUEUE);
        let host = Self {
            activation,
            clients: RwLock::new(Vec::new()),
        };
        (host, requests)
    }

    pub async fn set_clients(&self, clients: Vec<ClientInfo>) {
        *self.clients.write().await = clients;
    }
}

#[async_trait]
impl WorkerHost for StandaloneHost {
    async fn skip_waiting(&self) -> Result<(), HostError> {
        let (done, settled) = oneshot::channel();
        self.activation
            .send(ActivationRequest { done })
            .await
            .map_err(|_| HostError("activation listener is not running".to_string()))?;
        settled
            .await
            .map_err(|_| HostError("activation request was dropped".to_string()))
    }

    async fn claim_clients(&self) -> Result<(), HostError> {
        let mut clients = self.clients.write().await;
        for client in clients.iter_mut() {
            client.controlled = false;
        }
        debug!(clients = clients.len(), "Claimed clients");
        Ok(())
    }

    async fn match_clients(
        &self,
        include_uncontrolled: bool,
    ) -> Result<Vec<ClientInfo>, HostError> {
        let clients = self.clients.read().await;
        Ok(clients
            .iter()
            .filter(|client| include_uncontrolled || client.controlled)
            .cloned()
            .collect())
    }
}

/// Runs activation for every queued skip-wait request.
///
/// Each request is acknowledged once its activation attempt has finished,
/// successful or not.
pub fn spawn_activation_listener(
    mut requests: mpsc::Receiver<ActivationRequest>,
    controller: Arc<LifecycleController>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            match controller.activate().await {
                Ok(report) => {
                    info!(deleted = report.deleted.len(), "Activation requested by skip waiting");
                }
                Err(EngineError::InvalidState { from, .. })
                    if from == LifecycleState::Activated || from == LifecycleState::Installing =>
                {
                    debug!(state = %from, "Skip waiting has nothing to activate yet");
                }
                Err(err) => warn!("Activation failed: {}", err),
            }
            // The requester may have timed out already.
            let _ = request.done.send(());
        }
    })
}
