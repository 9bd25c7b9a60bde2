use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

use super::{CacheBackend, CacheError};

/// Default bound on stored keys.
pub const DEFAULT_MAX_ENTRIES: u64 = 100_000;

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Expires each entry at the deadline it was written with.
struct WriteDeadline;

impl Expiry<String, Entry> for WriteDeadline {
    fn expire_after_create(&self, _key: &String, entry: &Entry, now: Instant) -> Option<Duration> {
        Some(entry.expires_at.saturating_duration_since(now))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        now: Instant,
        _current: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.expires_at.saturating_duration_since(now))
    }
}

/// In-process cache backend used when no Redis URL is configured.
///
/// Entries expire individually and are evicted by moka's maintenance tasks, so
/// keys that are never read again do not pile up. Capacity is bounded.
#[derive(Clone)]
pub struct MemoryBackend {
    entries: Cache<String, Entry>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(WriteDeadline)
            .build();
        Self { entries }
    }

    /// Remaining time to live of a live entry.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let entry = self.entries.get(key).await?;
        entry.expires_at.checked_duration_since(Instant::now())
    }

    /// Number of live entries, after running pending evictions.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("k", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));
        let ttl = backend.ttl("k").await.unwrap();
        assert!(ttl > Duration::from_secs(55) && ttl <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("k", "v".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(backend.get("k").await.unwrap().is_none());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted_without_reads() {
        let backend = MemoryBackend::new();
        for i in 0..10_000 {
            backend
                .set_ex(&format!("k{i}"), "v".to_string(), Duration::from_millis(1))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        backend
            .set_ex("fresh", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn test_overwrite_takes_new_ttl() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("k", "old".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        backend
            .set_ex("k", "new".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let backend = MemoryBackend::with_capacity(10);
        for i in 0..100 {
            backend
                .set_ex(&format!("k{i}"), "v".to_string(), Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert!(backend.len().await <= 10);
    }

    #[tokio::test]
    async fn test_del_removes_entry() {
        let backend = MemoryBackend::new();
        backend
            .set_ex("k", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        backend.del("k").await.unwrap();
        assert!(backend.get("k").await.unwrap().is_none());
    }
}
