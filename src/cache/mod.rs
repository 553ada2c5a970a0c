//! Cache Module
//!
//! Named, replace-on-write response caches shared by every component, plus
//! the count/age expiration policy applied after writes.

mod clock;
mod entry;
mod expiration;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use entry::{CacheEntry, EntryMeta};
pub use expiration::{ExpirationPolicy, ExpirationReport};
pub use stats::CacheStats;
pub use store::CacheStorage;

// == Public Constants ==
/// Milliseconds per second, used when comparing ages against policies
pub const MILLIS_PER_SECOND: u64 = 1000;
