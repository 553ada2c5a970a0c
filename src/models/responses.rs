//! Outbound models
//!
//! The response produced for an intercepted request, the version reply, and
//! the JSON bodies returned by the HTTP host binding.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Serialize;

use crate::cache::CacheStats;
use crate::lifecycle::{ActivationReport, LifecycleState};
use crate::precache::InstallReport;

/// A response served to the page, either from a cache or the network.
///
/// Bodies are reference counted, so cloning a response never copies bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Lower-cased header names
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Creates a response with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Creates a `200 OK` response.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    /// Adds a header, lower-casing its name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Only complete `200` responses are written to caches.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }
}

/// Reply to a `GET_VERSION` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionReply {
    pub version: String,
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Deployed version token
    pub version: String,
    /// Current lifecycle state
    pub state: LifecycleState,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(version: impl Into<String>, state: LifecycleState) -> Self {
        Self {
            status: "healthy".to_string(),
            version: version.into(),
            state,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One cache as reported by `GET /caches`
#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_entries: usize,
    pub hit_rate: f64,
}

impl CacheSummary {
    pub fn new(name: impl Into<String>, stats: &CacheStats) -> Self {
        Self {
            name: name.into(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for `GET /caches`
#[derive(Debug, Clone, Serialize)]
pub struct CachesResponse {
    pub caches: Vec<CacheSummary>,
}

/// Response body for `POST /lifecycle/install`
#[derive(Debug, Clone, Serialize)]
pub struct InstallResponse {
    pub state: LifecycleState,
    pub fetched: Vec<String>,
    pub copied: Vec<String>,
    pub reused: Vec<String>,
    pub stale: Vec<String>,
}

impl InstallResponse {
    pub fn new(state: LifecycleState, report: InstallReport) -> Self {
        Self {
            state,
            fetched: report.fetched,
            copied: report.copied,
            reused: report.reused,
            stale: report.stale,
        }
    }
}

/// Response body for `POST /lifecycle/activate`
#[derive(Debug, Clone, Serialize)]
pub struct ActivateResponse {
    pub state: LifecycleState,
    pub deleted: Vec<String>,
    pub clients: Vec<String>,
}

impl ActivateResponse {
    pub fn new(state: LifecycleState, report: ActivationReport) -> Self {
        Self {
            state,
            deleted: report.deleted,
            clients: report.clients,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
