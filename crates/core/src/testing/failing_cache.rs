use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::cache::{CacheBackend, CacheError};

/// Cache backend whose every call fails, counting the attempts.
#[derive(Debug, Default)]
pub struct FailingCacheBackend {
    calls: AtomicUsize,
}

impl FailingCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Backend("connection refused".to_string()))
    }
}

#[async_trait]
impl CacheBackend for FailingCacheBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        self.fail()
    }

    async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        self.fail()
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        self.fail()
    }
}

/// Cache backend whose calls never complete, like a Redis that stopped answering.
#[derive(Debug, Default)]
pub struct StallingCacheBackend {
    calls: AtomicUsize,
}

impl StallingCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn stall<T>(&self) -> Result<T, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[async_trait]
impl CacheBackend for StallingCacheBackend {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        self.stall().await
    }

    async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        self.stall().await
    }

    async fn del(&self, _key: &str) -> Result<(), CacheError> {
        self.stall().await
    }
}
