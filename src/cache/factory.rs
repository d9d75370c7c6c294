//! Cache Factory Module
//!
//! Builds cache entries: isolates the caller's value and stamps the
//! expiration instant from the injected clock.

use chrono::{DateTime, Duration, Utc};

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::entry::expiry_after;
use crate::cache::{CacheEntry, Value};
use crate::error::Result;

// == Factory Trait ==
/// Entry construction and the time source the handler checks expiry against.
pub trait Factory {
    /// Builds an entry holding a deep copy of `value`, expiring `ttl` from now.
    ///
    /// # Errors
    /// `CacheError::UnclonableValue` if `value` contains a `Handle`. No entry
    /// is built in that case.
    fn create(&self, value: &Value, ttl: Duration) -> Result<CacheEntry>;

    fn now(&self) -> DateTime<Utc>;
}

// == Cache Factory ==
/// Default factory, generic over its clock.
#[derive(Debug, Clone, Default)]
pub struct CacheFactory<C = SystemClock> {
    clock: C,
}

impl<C: Clock> CacheFactory<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> Factory for CacheFactory<C> {
    fn create(&self, value: &Value, ttl: Duration) -> Result<CacheEntry> {
        value.ensure_data()?;

        let expires_at = expiry_after(self.clock.now(), ttl);
        Ok(CacheEntry::new(value.clone(), expires_at))
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Handle, ManualClock};
    use crate::error::CacheError;
    use serde_json::json;

    #[test]
    fn test_create_stamps_expiry_from_clock() {
        let clock = ManualClock::default();
        let factory = CacheFactory::new(clock.clone());

        let entry = factory
            .create(&Value::Int(123), Duration::milliseconds(1000))
            .unwrap();

        assert_eq!(entry.expires_at(), clock.now() + Duration::milliseconds(1000));
        assert_eq!(entry.value(), &Value::Int(123));
    }

    #[test]
    fn test_create_copies_value() {
        let factory = CacheFactory::new(ManualClock::default());
        let mut original = Value::from(json!({"list": [1, 2, [3, 4]]}));

        let entry = factory.create(&original, Duration::seconds(1)).unwrap();
        original.get_mut("list").and_then(Value::as_array_mut).unwrap()[2] = Value::Int(0);

        assert_eq!(entry.value(), &Value::from(json!({"list": [1, 2, [3, 4]]})));
    }

    #[test]
    fn test_create_rejects_handle() {
        let factory = CacheFactory::new(ManualClock::default());
        let value = Value::from(vec![Value::Int(1), Value::from(Handle::new("promise", ()))]);

        let result = factory.create(&value, Duration::seconds(1));

        assert!(matches!(
            result,
            Err(CacheError::UnclonableValue { ref path, .. }) if path == "$[1]"
        ));
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let factory = CacheFactory::new(ManualClock::default());

        let entry = factory.create(&Value::Null, Duration::zero()).unwrap();

        assert!(entry.is_expired(factory.now()));
    }
}
