//! Offline Worker - a request-interception cache engine
//!
//! Routes intercepted requests through caching strategies, keeps runtime
//! caches bounded, installs a versioned precache and drives the worker
//! install/activate lifecycle.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod network;
pub mod precache;
pub mod routing;
pub mod strategies;
pub mod tasks;
pub mod worker;

pub use api::{create_router, AppState};
pub use config::{Config, EngineConfig};
pub use error::{EngineError, Result};
pub use tasks::{spawn_expiration_sweep, EventScope};
pub use worker::Worker;
