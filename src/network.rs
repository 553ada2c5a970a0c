//! Network Module
//!
//! The outbound fetch collaborator. Strategies and the precache installer
//! only see the [`Network`] trait; the binary plugs in [`HttpNetwork`].

use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

use crate::models::{Request, Response};

/// Failure reported by the network collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The collaborator's own timeout fired
    #[error("request timed out")]
    Timeout,
}

/// Response the host started fetching in parallel with worker startup.
///
/// Resolves to `Ok(None)` when the host decided not to preload after all.
pub type PreloadResponse = BoxFuture<'static, Result<Option<Response>, FetchError>>;

/// Issues real network requests on behalf of the engine.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

// == HTTP Network ==
/// [`Network`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    /// Creates a client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let reply = self
            .client
            .request(method, &request.url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = reply.status().as_u16();
        let mut response = Response::new(status, bytes::Bytes::new());
        for (name, value) in reply.headers() {
            if let Ok(value) = value.to_str() {
                response = response.with_header(name.as_str(), value);
            }
        }
        response.body = reply.bytes().await.map_err(map_reqwest_error)?;

        debug!(url = %request.url, status, "Network fetch complete");
        Ok(response)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(
            FetchError::Transport("connection refused".into()).to_string(),
            "transport error: connection refused"
        );
        assert_eq!(FetchError::Timeout.to_string(), "request timed out");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let network = HttpNetwork::new(Duration::from_millis(500)).unwrap();
        let result = network.fetch(&Request::get("http://127.0.0.1:1/none")).await;
        assert!(result.is_err());
    }
}
