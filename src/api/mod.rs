//! API Module
//!
//! HTTP binding that delivers host events to the worker.
//!
//! # Endpoints
//! - `GET /fetch?url=&method=&destination=` - Resolve an intercepted request
//! - `POST /message` - Post a page message
//! - `POST /lifecycle/install` - Run the install step
//! - `POST /lifecycle/activate` - Run the activate step
//! - `GET /caches` - List caches with statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
