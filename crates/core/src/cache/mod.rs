//! Namespaced key-value cache with per-purpose TTLs.
//!
//! [`TieredCache`] sits in front of a [`CacheBackend`] (Redis in production,
//! an in-process map otherwise). Every tier degrades to a pass-through when the
//! backend is missing or failing: reads become misses and writes are dropped
//! after being logged.

mod memory;
mod redis_backend;
mod tiered;

pub use memory::{MemoryBackend, DEFAULT_MAX_ENTRIES};
pub use redis_backend::RedisBackend;
pub use tiered::{CacheStats, RetryPolicy, TieredCache};

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Prefix shared by every key written by this service.
pub const KEY_PREFIX: &str = "mirador-addon";

/// Stream results with at least one entry.
pub const STREAM_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Empty stream results.
pub const STREAM_EMPTY_TTL: Duration = Duration::from_secs(60);
pub const RESOLVED_URL_TTL: Duration = Duration::from_secs(3 * 60 * 60);
/// Resolved URLs pointing at a static placeholder video.
pub const STATIC_URL_TTL: Duration = Duration::from_secs(60);
pub const AVAILABILITY_TTL: Duration = Duration::from_secs(5 * 24 * 60 * 60);
pub const PLAYED_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const CATALOG_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default bound on a single backend call.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(500);

/// Errors raised by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Raw string storage behind the cache tiers.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logs and the config endpoint.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache tiers, each with its own key space and TTL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Stream,
    Resolved,
    Availability,
    Played,
    Catalog,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Stream => "stream",
            Namespace::Resolved => "resolved",
            Namespace::Availability => "availability",
            Namespace::Played => "played",
            Namespace::Catalog => "catalog",
        }
    }

    /// Full backend key for `key` in this namespace.
    pub fn key(&self, key: &str) -> String {
        format!("{KEY_PREFIX}|{}:{key}", self.as_str())
    }

    /// Whether transient failures in this tier are retried.
    pub fn retries(&self) -> bool {
        matches!(self, Namespace::Availability | Namespace::Played)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_keys() {
        assert_eq!(
            Namespace::Stream.key("tt0111161"),
            "mirador-addon|stream:tt0111161"
        );
        assert_eq!(
            Namespace::Played.key("abc:0"),
            "mirador-addon|played:abc:0"
        );
    }

    #[test]
    fn test_only_secondary_tiers_retry() {
        assert!(Namespace::Availability.retries());
        assert!(Namespace::Played.retries());
        assert!(!Namespace::Stream.retries());
        assert!(!Namespace::Resolved.retries());
        assert!(!Namespace::Catalog.retries());
    }
}
