//! Request, response and message models
//!
//! This module defines the values that cross the engine boundary: the
//! intercepted request descriptor, the response produced for it, the
//! foreground message protocol, and the DTOs used by the HTTP host binding.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ClientMessage, Destination, FetchQuery, Request};
pub use responses::{
    ActivateResponse, CacheSummary, CachesResponse, ErrorResponse, HealthResponse,
    InstallResponse, Response, VersionReply,
};
