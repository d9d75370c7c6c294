//! Cache Module
//!
//! Provides a per-scope in-process cache with lazy TTL expiration, value
//! isolation and snapshot handoff.

pub mod clock;
mod entry;
mod factory;
mod handler;
pub mod snapshot;
mod storage;
mod value;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use factory::{CacheFactory, Factory};
pub use handler::CacheHandler;
pub use snapshot::SNAPSHOT_VERSION;
pub use storage::{MapStorage, Storage};
pub use value::{Handle, Value};

// == Public Constants ==
/// Maximum nesting of arrays and maps inside one cached value.
///
/// Snapshot text wraps each value in three more levels of JSON objects and
/// the snapshot parser stops at 127, so deeper values could be written but
/// never restored.
pub const MAX_VALUE_DEPTH: usize = 100;
