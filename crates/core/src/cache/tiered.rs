use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    CacheBackend, CacheError, Namespace, AVAILABILITY_TTL, CATALOG_TTL,
    DEFAULT_OPERATION_TIMEOUT, PLAYED_TTL, RESOLVED_URL_TTL, STATIC_URL_TTL, STREAM_EMPTY_TTL,
    STREAM_TTL,
};
use crate::config::CacheConfig;
use crate::metrics::{CACHE_FAILURES, CACHE_OPERATIONS};
use crate::stream::{is_static_url, StreamCandidate};

/// Bounded retry with a fixed delay, used by the availability and played tiers.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl From<&CacheConfig> for RetryPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Snapshot of cache operation counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub backend: String,
    pub total_operations: u64,
    pub failed_operations: u64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Counters {
    total: AtomicU64,
    failed: AtomicU64,
    last_error: Mutex<Option<(String, DateTime<Utc>)>>,
}

/// Namespaced cache facade over an optional backend.
///
/// Without a backend every operation is a pass-through: reads miss, writes are
/// dropped and `wrap_*` helpers always run their producer. Each backend call is
/// bounded by the operation timeout; a call that exceeds it is a failure.
#[derive(Clone)]
pub struct TieredCache {
    backend: Option<Arc<dyn CacheBackend>>,
    retry: RetryPolicy,
    operation_timeout: Duration,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("retry", &self.retry)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl TieredCache {
    pub fn new(backend: Arc<dyn CacheBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend: Some(backend),
            retry,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            counters: Arc::default(),
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// A cache that stores nothing.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            retry: RetryPolicy::default(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            counters: Arc::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn stats(&self) -> CacheStats {
        let last_error = self
            .counters
            .last_error
            .lock()
            .ok()
            .and_then(|guard| guard.clone());
        CacheStats {
            backend: self
                .backend
                .as_ref()
                .map(|b| b.name().to_string())
                .unwrap_or_else(|| "disabled".to_string()),
            total_operations: self.counters.total.load(Ordering::Relaxed),
            failed_operations: self.counters.failed.load(Ordering::Relaxed),
            last_error: last_error.as_ref().map(|(msg, _)| msg.clone()),
            last_error_at: last_error.map(|(_, at)| at),
        }
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    /// Read and decode a value. Failures and malformed payloads are misses.
    pub async fn get<T: DeserializeOwned>(&self, ns: Namespace, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;
        let full_key = ns.key(key);
        let raw = self
            .run(ns, "get", || backend.get(&full_key))
            .await
            .ok()
            .flatten()?;

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key = %full_key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %full_key, error = %e, "Discarding malformed cache payload");
                None
            }
        }
    }

    /// Encode and write a value. Errors are logged and swallowed.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        ns: Namespace,
        key: &str,
        value: &T,
        ttl: Duration,
    ) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let full_key = ns.key(key);
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %full_key, error = %e, "Failed to encode cache payload");
                return;
            }
        };
        let _ = self
            .run(ns, "set", || backend.set_ex(&full_key, payload.clone(), ttl))
            .await;
    }

    /// Delete a key. Errors are logged and swallowed.
    pub async fn remove(&self, ns: Namespace, key: &str) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let full_key = ns.key(key);
        let _ = self.run(ns, "del", || backend.del(&full_key)).await;
    }

    /// Run one backend operation under the timeout, retrying where the
    /// namespace allows it.
    async fn run<T, F, Fut>(&self, ns: Namespace, op: &str, mut f: F) -> Result<T, CacheError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CacheError>>,
    {
        let attempts = if ns.retries() {
            self.retry.max_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            self.counters.total.fetch_add(1, Ordering::Relaxed);
            CACHE_OPERATIONS
                .with_label_values(&[ns.as_str(), op])
                .inc();

            let outcome = match tokio::time::timeout(self.operation_timeout, f()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(CacheError::Timeout(self.operation_timeout)),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    self.record_failure(ns, &e);
                    if attempt >= attempts {
                        warn!(
                            namespace = %ns,
                            op,
                            attempt,
                            error = %e,
                            "Cache operation failed, passing through"
                        );
                        return Err(e);
                    }
                    debug!(namespace = %ns, op, attempt, error = %e, "Retrying cache operation");
                    attempt += 1;
                    tokio::time::sleep(self.retry.delay).await;
                }
            }
        }
    }

    fn record_failure(&self, ns: Namespace, error: &CacheError) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        CACHE_FAILURES.with_label_values(&[ns.as_str()]).inc();
        if let Ok(mut last) = self.counters.last_error.lock() {
            *last = Some((error.to_string(), Utc::now()));
        }
    }

    // =========================================================================
    // Stream results
    // =========================================================================

    pub async fn get_stream_results(&self, content_key: &str) -> Option<Vec<StreamCandidate>> {
        self.get(Namespace::Stream, content_key).await
    }

    /// Cache stream results: 24h when non-empty, 1min otherwise.
    pub async fn set_stream_results(&self, content_key: &str, results: &[StreamCandidate]) {
        let ttl = if results.is_empty() {
            STREAM_EMPTY_TTL
        } else {
            STREAM_TTL
        };
        self.set(Namespace::Stream, content_key, results, ttl).await;
    }

    // =========================================================================
    // Resolved URLs
    // =========================================================================

    /// Return the cached URL for `id`, or produce and cache it.
    ///
    /// Static placeholder URLs are only kept for a minute so that a failed
    /// resolution is retried soon.
    pub async fn wrap_resolved_url<F, Fut, E>(&self, id: &str, producer: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(url) = self.get::<String>(Namespace::Resolved, id).await {
            return Ok(url);
        }
        let url = producer().await?;
        let ttl = if is_static_url(&url) {
            STATIC_URL_TTL
        } else {
            RESOLVED_URL_TTL
        };
        self.set(Namespace::Resolved, id, &url, ttl).await;
        Ok(url)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub async fn wrap_catalog<T, F, Fut, E>(&self, key: &str, producer: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(Namespace::Catalog, key).await {
            return Ok(value);
        }
        let value = producer().await?;
        self.set(Namespace::Catalog, key, &value, CATALOG_TTL).await;
        Ok(value)
    }

    // =========================================================================
    // Availability
    // =========================================================================

    /// Record that `file_ids` of `info_hash` are available.
    ///
    /// Adding a list already present is a no-op. Lists stay sorted by length,
    /// longest first.
    pub async fn cache_availability(&self, info_hash: &str, file_ids: &[u32]) {
        if !self.is_enabled() {
            return;
        }
        let key = info_hash.to_lowercase();
        let mut lists: Vec<Vec<u32>> = self
            .get(Namespace::Availability, &key)
            .await
            .unwrap_or_default();
        if lists.iter().any(|existing| existing.as_slice() == file_ids) {
            return;
        }
        lists.push(file_ids.to_vec());
        lists.sort_by(|a, b| b.len().cmp(&a.len()));
        self.set(Namespace::Availability, &key, &lists, AVAILABILITY_TTL)
            .await;
    }

    /// Drop one matching file-id list for `info_hash`.
    pub async fn remove_availability(&self, info_hash: &str, file_ids: &[u32]) {
        if !self.is_enabled() {
            return;
        }
        let key = info_hash.to_lowercase();
        let Some(mut lists) = self
            .get::<Vec<Vec<u32>>>(Namespace::Availability, &key)
            .await
        else {
            return;
        };
        let Some(pos) = lists.iter().position(|l| l.as_slice() == file_ids) else {
            return;
        };
        lists.remove(pos);
        if lists.is_empty() {
            self.remove(Namespace::Availability, &key).await;
        } else {
            self.set(Namespace::Availability, &key, &lists, AVAILABILITY_TTL)
                .await;
        }
    }

    /// Known available file-id lists, keyed by lowercased infoHash.
    pub async fn get_availability(&self, info_hashes: &[String]) -> HashMap<String, Vec<Vec<u32>>> {
        let mut found = HashMap::new();
        if !self.is_enabled() {
            return found;
        }
        for hash in info_hashes {
            let key = hash.to_lowercase();
            if let Some(lists) = self
                .get::<Vec<Vec<u32>>>(Namespace::Availability, &key)
                .await
            {
                found.insert(key, lists);
            }
        }
        found
    }

    // =========================================================================
    // Played markers
    // =========================================================================

    fn played_key(info_hash: &str, file_index: u32) -> String {
        format!("{}:{}", info_hash.to_lowercase(), file_index)
    }

    pub async fn mark_played(&self, info_hash: &str, file_index: u32) {
        let key = Self::played_key(info_hash, file_index);
        self.set(
            Namespace::Played,
            &key,
            &Utc::now().timestamp_millis(),
            PLAYED_TTL,
        )
        .await;
    }

    pub async fn is_played(&self, info_hash: &str, file_index: u32) -> bool {
        let key = Self::played_key(info_hash, file_index);
        self.get::<i64>(Namespace::Played, &key).await.is_some()
    }

    /// Played timestamps (ms) keyed `"<infoHash>@<fileIndex>"`; unplayed pairs are absent.
    pub async fn get_played(&self, pairs: &[(String, u32)]) -> HashMap<String, i64> {
        let mut found = HashMap::new();
        if !self.is_enabled() {
            return found;
        }
        for (hash, index) in pairs {
            let key = Self::played_key(hash, *index);
            if let Some(at) = self.get::<i64>(Namespace::Played, &key).await {
                found.insert(format!("{}@{}", hash.to_lowercase(), index), at);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryBackend;
    use crate::testing::{fixtures, FailingCacheBackend, StallingCacheBackend};
    use std::time::Instant;
    use std::sync::atomic::AtomicUsize;

    fn memory_cache() -> (TieredCache, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let cache = TieredCache::new(backend.clone(), RetryPolicy::default());
        (cache, backend)
    }

    fn failing_cache() -> (TieredCache, Arc<FailingCacheBackend>) {
        let backend = Arc::new(FailingCacheBackend::new());
        let retry = RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        };
        let cache = TieredCache::new(backend.clone(), retry);
        (cache, backend)
    }

    #[tokio::test]
    async fn test_round_trip_returns_value_unchanged() {
        let (cache, _) = memory_cache();
        let candidates = vec![
            fixtures::candidate("tt0111161", "aaa", 10),
            fixtures::candidate("tt0111161", "bbb", 5),
        ];
        cache
            .set(Namespace::Stream, "tt0111161", &candidates, STREAM_TTL)
            .await;

        let read: Vec<StreamCandidate> = cache.get(Namespace::Stream, "tt0111161").await.unwrap();
        assert_eq!(read, candidates);
    }

    #[tokio::test]
    async fn test_stream_results_ttl_depends_on_emptiness() {
        let (cache, backend) = memory_cache();
        cache
            .set_stream_results("tt1", &[fixtures::candidate("tt1", "aaa", 1)])
            .await;
        cache.set_stream_results("tt2", &[]).await;

        let full = backend.ttl("mirador-addon|stream:tt1").await.unwrap();
        let empty = backend.ttl("mirador-addon|stream:tt2").await.unwrap();
        assert!(full > Duration::from_secs(23 * 60 * 60));
        assert!(empty <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_miss() {
        let (cache, backend) = memory_cache();
        backend
            .set_ex(
                "mirador-addon|stream:tt1",
                "{not json".to_string(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        assert!(cache.get_stream_results("tt1").await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_passes_through() {
        let cache = TieredCache::disabled();
        cache
            .set_stream_results("tt1", &[fixtures::candidate("tt1", "aaa", 1)])
            .await;
        assert!(cache.get_stream_results("tt1").await.is_none());

        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let url: Result<String, ()> = cache
                .wrap_resolved_url("abc", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("magnet:?xt=urn:btih:abc".to_string())
                })
                .await;
            assert!(url.is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().backend, "disabled");
    }

    #[tokio::test]
    async fn test_failing_backend_fails_open_without_retry_on_stream_tier() {
        let (cache, backend) = failing_cache();
        assert!(cache.get_stream_results("tt1").await.is_none());
        cache.set_stream_results("tt1", &[]).await;
        assert_eq!(backend.calls(), 2);

        let stats = cache.stats();
        assert_eq!(stats.failed_operations, 2);
        assert!(stats.last_error.is_some());
        assert!(stats.last_error_at.is_some());
    }

    #[tokio::test]
    async fn test_stalled_backend_is_a_timed_out_miss() {
        let backend = Arc::new(StallingCacheBackend::new());
        let cache = TieredCache::new(backend.clone(), RetryPolicy::default())
            .with_operation_timeout(Duration::from_millis(50));

        let start = Instant::now();
        assert!(cache.get_stream_results("tt1").await.is_none());
        cache
            .set_stream_results("tt1", &[fixtures::candidate("tt1", "aaa", 1)])
            .await;
        assert!(start.elapsed() < Duration::from_secs(1));

        assert_eq!(backend.calls(), 2);
        let stats = cache.stats();
        assert_eq!(stats.failed_operations, 2);
        assert!(stats.last_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_failing_backend_retries_played_tier() {
        let (cache, backend) = failing_cache();
        cache.mark_played("abc", 0).await;
        assert_eq!(backend.calls(), 3);
        assert!(!cache.is_played("abc", 0).await);
        assert_eq!(backend.calls(), 6);
    }

    #[tokio::test]
    async fn test_wrap_resolved_url_caches_result() {
        let (cache, backend) = memory_cache();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let url: Result<String, ()> = cache
                .wrap_resolved_url("abc/0", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("magnet:?xt=urn:btih:abc".to_string())
                })
                .await;
            assert_eq!(url.unwrap(), "magnet:?xt=urn:btih:abc");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let ttl = backend.ttl("mirador-addon|resolved:abc/0").await.unwrap();
        assert!(ttl > Duration::from_secs(2 * 60 * 60));
    }

    #[tokio::test]
    async fn test_wrap_resolved_url_static_url_short_ttl() {
        let (cache, backend) = memory_cache();
        let url: Result<String, ()> = cache
            .wrap_resolved_url("abc/0", || async {
                Ok("http://localhost:7000/static/videos/failed_access_v2.mp4".to_string())
            })
            .await;
        assert!(url.is_ok());
        let ttl = backend.ttl("mirador-addon|resolved:abc/0").await.unwrap();
        assert!(ttl <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_wrap_resolved_url_error_not_cached() {
        let (cache, backend) = memory_cache();
        let url: Result<String, &str> = cache
            .wrap_resolved_url("abc/0", || async { Err("boom") })
            .await;
        assert_eq!(url.unwrap_err(), "boom");
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_wrap_catalog_caches_value() {
        let (cache, _) = memory_cache();
        let first: Result<Vec<String>, ()> = cache
            .wrap_catalog("top", || async { Ok(vec!["a".to_string()]) })
            .await;
        let second: Result<Vec<String>, ()> = cache
            .wrap_catalog("top", || async { Ok(vec!["b".to_string()]) })
            .await;
        assert_eq!(first.unwrap(), vec!["a".to_string()]);
        assert_eq!(second.unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_availability_add_dedup_sort_remove() {
        let (cache, _) = memory_cache();
        cache.cache_availability("ABC", &[1]).await;
        cache.cache_availability("abc", &[1, 2, 3]).await;
        cache.cache_availability("abc", &[1]).await;

        let found = cache.get_availability(&["abc".to_string()]).await;
        assert_eq!(found["abc"], vec![vec![1, 2, 3], vec![1]]);

        cache.remove_availability("abc", &[1, 2, 3]).await;
        let found = cache.get_availability(&["abc".to_string()]).await;
        assert_eq!(found["abc"], vec![vec![1]]);

        cache.remove_availability("abc", &[1]).await;
        let found = cache.get_availability(&["abc".to_string()]).await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_played_markers() {
        let (cache, _) = memory_cache();
        assert!(!cache.is_played("abc", 2).await);
        cache.mark_played("abc", 2).await;
        assert!(cache.is_played("ABC", 2).await);

        let played = cache
            .get_played(&[("abc".to_string(), 2), ("abc".to_string(), 3)])
            .await;
        assert_eq!(played.len(), 1);
        assert!(played.contains_key("abc@2"));
    }
}
