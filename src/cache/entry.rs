//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use chrono::{DateTime, Duration, Utc};

use crate::cache::Value;

// == Cache Entry ==
/// Represents a single cache entry: a value owned by the cache and the
/// instant it stops being visible.
///
/// Entries are never mutated after construction; replacing a value means
/// storing a new entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Wraps an already-isolated value.
    ///
    /// Use a `Factory` to build entries from caller-held values; this
    /// constructor takes ownership and performs no copying or checks.
    pub fn new(value: Value, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    /// The stored value. Callers outside the cache must clone before
    /// handing it out.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now >= expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining TTL at `now`, or zero once expired.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }
}

// == Utility Functions ==
/// Computes `now + ttl`, saturating at the representable range.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    match now.checked_add_signed(ttl) {
        Some(instant) => instant,
        None if ttl > Duration::zero() => DateTime::<Utc>::MAX_UTC,
        None => DateTime::<Utc>::MIN_UTC,
    }
}
