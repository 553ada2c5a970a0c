//! Precache Module
//!
//! A versioned manifest of core assets installed ahead of time into a
//! dedicated cache, with diffing against previous installations so a new
//! version only downloads what changed.

mod manager;
mod manifest;

pub use manager::{InstallReport, PrecacheManager};
pub use manifest::{ManifestEntry, PrecacheManifest};
