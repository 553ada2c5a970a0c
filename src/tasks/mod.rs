//! Background Tasks Module
//!
//! Work that outlives the call that started it.
//!
//! # Tasks
//! - Event scopes: background work a host must wait for before it may
//!   suspend the worker (cache writes, refreshes, lifecycle handshakes)
//! - Expiration sweep: applies every route's expiration policy periodically

mod scope;
mod sweep;

pub use scope::EventScope;
pub use sweep::spawn_expiration_sweep;
