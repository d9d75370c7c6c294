//! Clock Module
//!
//! Time source injected into the cache factory, so expiry can be driven
//! by a controllable clock instead of the process-wide wall clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

// == Clock Trait ==
/// Supplies the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

// == System Clock ==
/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// == Manual Clock ==
/// A clock that only moves when told to.
///
/// Resolution is one millisecond: instants are truncated to whole
/// milliseconds, and the sub-millisecond part of every step is dropped, so
/// `advance(Duration::microseconds(500))` leaves the clock where it was.
///
/// Clones share the same instant, so a test can keep one clone and hand the
/// other to a factory, then advance time from the outside.
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// Current instant as Unix milliseconds
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Moves the clock forward (or backward, for a negative step) by whole
    /// milliseconds.
    pub fn advance(&self, step: Duration) {
        self.now_ms
            .fetch_add(step.num_milliseconds(), Ordering::SeqCst);
    }

    /// Jumps to `instant`, truncated to the millisecond.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.now_ms
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    /// Frozen at the current wall-clock instant.
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.now_ms.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
