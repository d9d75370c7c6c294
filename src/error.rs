//! Error types for the session cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the session cache.
///
/// Every variant is returned to the caller of the operation that produced it;
/// none of them leaves the cache in a partially modified state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// A written value holds a live handle and cannot be deep-copied
    #[error("Unclonable value at {path}: {label}")]
    UnclonableValue {
        /// Location of the offending element inside the value tree
        path: String,
        /// Label of the handle found there
        label: String,
    },

    /// A written value nests containers deeper than the cache accepts
    #[error("Value nested too deep at {path}: limit is {limit} levels")]
    NestingTooDeep {
        /// Location of the first container past the limit
        path: String,
        /// Maximum accepted nesting
        limit: usize,
    },

    /// A snapshot could not be produced
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A snapshot could not be restored
    #[error("Deserialization failed: {0}")]
    Deserialization(String),
}

// == Result Type Alias ==
/// Convenience Result type for the session cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclonable_message_names_path() {
        let err = CacheError::UnclonableValue {
            path: "$.user.session".to_string(),
            label: "pending fetch".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unclonable value at $.user.session: pending fetch"
        );
    }

    #[test]
    fn test_snapshot_errors_display() {
        assert!(CacheError::Serialization("x".into())
            .to_string()
            .starts_with("Serialization failed"));
        assert!(CacheError::Deserialization("x".into())
            .to_string()
            .starts_with("Deserialization failed"));
    }
}
