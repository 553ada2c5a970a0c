//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use offline_worker::cache::{CacheStorage, ManualClock};
use offline_worker::lifecycle::{ClientInfo, HostError, WorkerHost};
use offline_worker::models::{Request, Response};
use offline_worker::network::{FetchError, Network};
use offline_worker::{EngineConfig, Worker};

/// Network answering from a fixed table; unknown URLs fail like an outage.
#[derive(Debug, Default)]
pub struct FakeNetwork {
    responses: Mutex<HashMap<String, Response>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn serve(&self, url: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Response::ok(body.to_string()));
    }

    pub fn go_offline(&self) {
        self.responses.lock().unwrap().clear();
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.calls.lock().unwrap().push(request.url.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .ok_or_else(|| FetchError::Transport("offline".to_string()))
    }
}

/// Host whose skip-waiting either settles at once or never.
#[derive(Debug, Default)]
pub struct FakeHost {
    pub hang: bool,
    pub clients: Vec<ClientInfo>,
    pub skip_calls: AtomicUsize,
    pub claims: AtomicUsize,
}

impl FakeHost {
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// A host with one page still controlled by an older worker.
    pub fn with_older_client() -> Self {
        Self {
            clients: vec![ClientInfo::new("https://app.test/editor", true)],
            ..Self::default()
        }
    }

    pub fn skip_calls(&self) -> usize {
        self.skip_calls.load(Ordering::SeqCst)
    }

    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerHost for FakeHost {
    async fn skip_waiting(&self) -> Result<(), HostError> {
        self.skip_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), HostError> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn match_clients(&self, include_uncontrolled: bool) -> Result<Vec<ClientInfo>, HostError> {
        Ok(self
            .clients
            .iter()
            .filter(|c| include_uncontrolled || c.controlled)
            .cloned()
            .collect())
    }
}

pub fn storage() -> (CacheStorage, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    (CacheStorage::new(clock.clone()), clock)
}

pub fn worker(
    config: EngineConfig,
    storage: &CacheStorage,
    network: &Arc<FakeNetwork>,
    host: &Arc<FakeHost>,
) -> Worker {
    Worker::new(config, storage.clone(), network.clone(), host.clone()).unwrap()
}
