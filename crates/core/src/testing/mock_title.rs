//! Mock title resolver for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::metadata::{MetadataError, TitleResolver};

/// Mock implementation of the TitleResolver trait.
#[derive(Default)]
pub struct MockTitleResolver {
    titles: Arc<RwLock<HashMap<String, String>>>,
    failing: Arc<RwLock<bool>>,
    calls: AtomicUsize,
}

impl MockTitleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_title(&self, imdb_id: &str, title: &str) {
        self.titles
            .write()
            .await
            .insert(imdb_id.to_string(), title.to_string());
    }

    /// Make every lookup fail with an HTTP-like error.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TitleResolver for MockTitleResolver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn lookup_title(&self, imdb_id: &str) -> Result<String, MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing.read().await {
            return Err(MetadataError::ParseError("mock lookup failure".to_string()));
        }
        self.titles
            .read()
            .await
            .get(imdb_id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(imdb_id.to_string()))
    }
}
