//! Session Cache - A per-scope in-process key/value cache
//!
//! Memoizes computed or fetched values for the lifetime of a request or
//! session, with lazy TTL expiration and a snapshot format for handing
//! cache state from one processing phase to the next.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheHandler, Value};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
