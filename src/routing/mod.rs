//! Routing Module
//!
//! Maps intercepted requests to a strategy and cache name. Matchers are
//! plain data loaded from configuration and compiled once at startup.

mod matcher;
mod route;
mod router;

pub use matcher::{Matcher, MatcherSpec};
pub use route::{Route, RouteSpec};
pub use router::{FetchEvent, Router};
