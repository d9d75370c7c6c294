//! Cache Snapshot Module
//!
//! Textual form of the cache handed between processing phases. Entries carry
//! their remaining TTL rather than an absolute instant, so the consumer can
//! run on a clock with a different origin.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

// == Snapshot ==
/// `{"version":1,"entries":{"<key>":{"value":..,"ttl":<ms>}}}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot<V> {
    pub version: u32,
    pub entries: BTreeMap<String, SnapshotEntry<V>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotEntry<V> {
    pub value: V,
    /// Remaining TTL in milliseconds
    pub ttl: i64,
}

impl<V> Snapshot<V> {
    pub fn new() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Records `value` under `key` with `remaining` TTL, rounded up to the
    /// next millisecond so a live entry never restores as expired.
    pub fn insert(&mut self, key: String, value: V, remaining: Duration) {
        let mut ttl = remaining.num_milliseconds();
        if remaining > Duration::milliseconds(ttl) {
            ttl += 1;
        }
        self.entries.insert(key, SnapshotEntry { value, ttl });
    }
}

impl<V> Default for Snapshot<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Serialize> Snapshot<V> {
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}

impl<V: for<'de> Deserialize<'de>> Snapshot<V> {
    /// Parses snapshot text, rejecting unknown format versions.
    pub fn from_text(text: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(text)
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::Deserialization(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

impl<V> SnapshotEntry<V> {
    pub fn ttl(&self) -> Duration {
        // Duration cannot represent i64::MIN milliseconds
        Duration::milliseconds(self.ttl.max(-i64::MAX))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Value;

    #[test]
    fn test_insert_rounds_ttl_up() {
        let mut snapshot: Snapshot<Value> = Snapshot::new();
        snapshot.insert(
            "a".to_string(),
            Value::Int(1),
            Duration::microseconds(1500),
        );
        snapshot.insert("b".to_string(), Value::Int(2), Duration::milliseconds(7));

        assert_eq!(snapshot.entries["a"].ttl, 2);
        assert_eq!(snapshot.entries["b"].ttl, 7);
    }

    #[test]
    fn test_text_layout() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("aaa".to_string(), &Value::Int(123), Duration::milliseconds(10));

        assert_eq!(
            snapshot.to_text().unwrap(),
            r#"{"version":1,"entries":{"aaa":{"value":123,"ttl":10}}}"#
        );
    }

    #[test]
    fn test_from_text() {
        let snapshot: Snapshot<Value> =
            Snapshot::from_text(r#"{"version":1,"entries":{"k":{"value":[1,"x"],"ttl":-3}}}"#)
                .unwrap();

        let entry = &snapshot.entries["k"];
        assert_eq!(entry.value, Value::from(vec![Value::Int(1), Value::from("x")]));
        assert_eq!(entry.ttl(), Duration::milliseconds(-3));
    }

    #[test]
    fn test_from_text_rejects_malformed() {
        let cases = [
            "",
            "not json",
            r#"{"version":2,"entries":{}}"#,
            r#"{"entries":{}}"#,
            r#"{"version":1,"entries":{"k":{"value":1}}}"#,
            r#"{"version":1,"entries":{"k":{"ttl":5}}}"#,
            r#"{"version":1,"entries":{"k":{"value":1,"ttl":"soon"}}}"#,
            r#"{"version":1,"entries":{},"extra":true}"#,
        ];

        for text in cases {
            let result = Snapshot::<Value>::from_text(text);
            assert!(
                matches!(result, Err(CacheError::Deserialization(_))),
                "accepted malformed snapshot: {:?}",
                text
            );
        }
    }

    #[test]
    fn test_extreme_ttl_is_clamped() {
        let entry = SnapshotEntry {
            value: Value::Null,
            ttl: i64::MIN,
        };
        assert_eq!(entry.ttl(), Duration::milliseconds(-i64::MAX));
    }
}
