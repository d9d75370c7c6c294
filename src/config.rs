//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;

use chrono::Duration;

/// Default TTL in milliseconds for entries written without an explicit TTL.
pub const DEFAULT_TTL_MS: i64 = 60_000;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Whether reads are visible when the handler is created
    pub enabled: bool,
    /// Default TTL for entries written without an explicit TTL
    pub ttl: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED` - Initial enabled flag (default: true)
    /// - `CACHE_TTL_MS` - Default TTL in milliseconds (default: 60000)
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(true),
            ttl: env::var("CACHE_TTL_MS")
                .ok()
                .and_then(|v| v.trim().parse::<i64>().ok())
                .map(|ms| Duration::milliseconds(ms.max(-i64::MAX)))
                .unwrap_or_else(|| Duration::milliseconds(DEFAULT_TTL_MS)),
        }
    }

    /// Returns a copy with the enabled flag replaced.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns a copy with the default TTL replaced.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::milliseconds(DEFAULT_TTL_MS),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
