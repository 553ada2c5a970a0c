//! Lifecycle Module
//!
//! Install, activation and the page-facing message protocol of one worker
//! instance.

mod controller;
mod host;
mod state;

pub use controller::{ActivationReport, LifecycleController, SkipWaitOutcome};
pub use host::{
    spawn_activation_listener, ActivationRequest, ClientInfo, HostError, StandaloneHost,
    WorkerHost,
};
pub use state::LifecycleState;
