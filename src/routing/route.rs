//! Route definitions

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::ExpirationPolicy;
use crate::error::Result;
use crate::models::Request;
use crate::routing::{Matcher, MatcherSpec};
use crate::strategies::{StrategyKind, StrategyOptions};

fn default_method() -> String {
    "GET".to_string()
}

/// One route as written in the deployment config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub matcher: MatcherSpec,
    pub strategy: StrategyKind,
    pub cache_name: String,
    #[serde(default)]
    pub expiration: Option<ExpirationPolicy>,
    /// NetworkFirst only
    #[serde(default)]
    pub network_timeout_seconds: Option<u64>,
    #[serde(default = "default_method")]
    pub method: String,
}

impl RouteSpec {
    pub fn new(matcher: MatcherSpec, strategy: StrategyKind, cache_name: impl Into<String>) -> Self {
        Self {
            matcher,
            strategy,
            cache_name: cache_name.into(),
            expiration: None,
            network_timeout_seconds: None,
            method: default_method(),
        }
    }

    pub fn with_expiration(mut self, policy: ExpirationPolicy) -> Self {
        self.expiration = Some(policy);
        self
    }

    pub fn with_network_timeout(mut self, seconds: u64) -> Self {
        self.network_timeout_seconds = Some(seconds);
        self
    }
}

// == Route ==
/// A compiled route: predicate, strategy and the options it runs with.
#[derive(Debug, Clone)]
pub struct Route {
    matcher: Matcher,
    method: String,
    strategy: StrategyKind,
    options: StrategyOptions,
}

impl Route {
    pub fn compile(spec: &RouteSpec) -> Result<Self> {
        let mut options = StrategyOptions::new(spec.cache_name.clone());
        if let Some(policy) = spec.expiration {
            options = options.with_expiration(policy);
        }
        if let Some(seconds) = spec.network_timeout_seconds {
            options = options.with_network_timeout(Duration::from_secs(seconds));
        }

        Ok(Self {
            matcher: spec.matcher.compile()?,
            method: spec.method.to_ascii_uppercase(),
            strategy: spec.strategy,
            options,
        })
    }

    pub fn matches(&self, request: &Request) -> bool {
        request.method == self.method && self.matcher.matches(request)
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn cache_name(&self) -> &str {
        &self.options.cache_name
    }

    pub fn options(&self) -> &StrategyOptions {
        &self.options
    }

    /// Expiration policy of the route's cache, if any.
    pub fn expiration(&self) -> Option<ExpirationPolicy> {
        self.options.expiration_policies().next().copied()
    }
}
