//! Configuration Module
//!
//! Two layers: [`Config`] holds process settings read from environment
//! variables, [`EngineConfig`] holds the deployment's worker configuration
//! (version, manifest, routes) loaded once from JSON and shared immutably.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::precache::PrecacheManifest;
use crate::routing::{MatcherSpec, RouteSpec};

/// Process configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Path to the JSON worker configuration
    pub worker_config: Option<PathBuf>,
    /// Expiration sweep interval in seconds, 0 disables the sweep
    pub sweep_interval: u64,
    /// Timeout for outbound network requests in seconds
    pub fetch_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `WORKER_CONFIG` - Path to the worker configuration JSON (default: none)
    /// - `SWEEP_INTERVAL` - Expiration sweep frequency in seconds (default: 60)
    /// - `FETCH_TIMEOUT` - Outbound request timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            worker_config: env::var("WORKER_CONFIG")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            sweep_interval: env::var("SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
            fetch_timeout: env::var("FETCH_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_timeout),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            worker_config: None,
            sweep_interval: 60,
            fetch_timeout: 30,
        }
    }
}

// == Engine Config ==
/// Deployment configuration of one worker version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Opaque build identifier reported to pages
    pub version: String,
    /// Name prefix shared by every precache generation
    pub precache_family: String,
    /// Name prefix of the current precache generation
    pub precache_prefix: String,
    /// Caches kept across versions
    pub keep_caches: Vec<String>,
    pub manifest: PrecacheManifest,
    /// Routes in match order
    pub routes: Vec<RouteSpec>,
    /// URL patterns that always go to the network uncached
    pub bypass: Vec<String>,
    pub navigation_preload: bool,
    pub skip_wait_timeout_ms: u64,
    /// Parallel fetches during precache install
    pub install_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: "dev".to_string(),
            precache_family: "precache-".to_string(),
            precache_prefix: "precache-v1-".to_string(),
            keep_caches: Vec::new(),
            manifest: PrecacheManifest::default(),
            routes: Vec::new(),
            bypass: Vec::new(),
            navigation_preload: true,
            skip_wait_timeout_ms: 2000,
            install_concurrency: 8,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            EngineError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Checks everything that would otherwise fail at request time.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(EngineError::InvalidConfig("version must not be empty".into()));
        }
        if !self.precache_prefix.starts_with(&self.precache_family) {
            return Err(EngineError::InvalidConfig(format!(
                "precache prefix {:?} is not in family {:?}",
                self.precache_prefix, self.precache_family
            )));
        }
        if self.install_concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "install_concurrency must be at least 1".into(),
            ));
        }
        if self.skip_wait_timeout_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "skip_wait_timeout_ms must be positive".into(),
            ));
        }
        for route in &self.routes {
            route.matcher.compile()?;
        }
        for pattern in &self.bypass {
            MatcherSpec::regex(pattern.as_str()).compile()?;
        }
        Ok(())
    }

    /// Name of this version's precache.
    pub fn precache_cache_name(&self) -> String {
        format!("{}{}", self.precache_prefix, self.version)
    }

    pub fn skip_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.skip_wait_timeout_ms)
    }
}
