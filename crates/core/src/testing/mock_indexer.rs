//! Mock indexer for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::searcher::{Indexer, IndexerInfo, RawCandidate, SearchError, SearchQuery};

/// Mock implementation of the Indexer trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable search results and indexer lists
/// - Record search queries for assertions
/// - Simulate failures and slow responses
pub struct MockIndexer {
    results: Arc<RwLock<Vec<RawCandidate>>>,
    searches: Arc<RwLock<Vec<SearchQuery>>>,
    /// If set, the next search will fail with this error.
    next_error: Arc<RwLock<Option<SearchError>>>,
    indexers: Arc<RwLock<Vec<IndexerInfo>>>,
    /// If set, every `list_indexers` call fails with this message.
    list_error: Arc<RwLock<Option<String>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    search_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl Default for MockIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIndexer {
    /// Create a mock indexer with no results and two enabled indexers.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(Vec::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            indexers: Arc::new(RwLock::new(vec![
                IndexerInfo {
                    id: 1,
                    name: "YTS".to_string(),
                    enabled: true,
                },
                IndexerInfo {
                    id: 2,
                    name: "EZTV".to_string(),
                    enabled: true,
                },
            ])),
            list_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
            search_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Set the results to return for subsequent searches.
    pub async fn set_results(&self, results: Vec<RawCandidate>) {
        *self.results.write().await = results;
    }

    /// Configure the next search to fail with the given error.
    pub async fn set_next_error(&self, error: SearchError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_indexers(&self, indexers: Vec<IndexerInfo>) {
        *self.indexers.write().await = indexers;
    }

    /// Make every `list_indexers` call fail (or succeed again with `None`).
    pub async fn set_list_error(&self, error: Option<&str>) {
        *self.list_error.write().await = error.map(str::to_string);
    }

    /// Delay every call by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn recorded_searches(&self) -> Vec<SearchQuery> {
        self.searches.read().await.clone()
    }

    /// Number of searches started, including ones still sleeping.
    pub fn search_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Indexer for MockIndexer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawCandidate>, SearchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.searches.write().await.push(query.clone());
        self.wait().await;

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let results = self.results.read().await;
        Ok(results
            .iter()
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn list_indexers(&self) -> Result<Vec<IndexerInfo>, SearchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;

        if let Some(err) = self.list_error.read().await.clone() {
            return Err(SearchError::ConnectionFailed(err));
        }
        Ok(self.indexers.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searcher::SearchCategory;
    use crate::testing::fixtures;

    fn query(limit: u32) -> SearchQuery {
        SearchQuery {
            query: "movie".to_string(),
            category: SearchCategory::Movies,
            limit,
            indexer_ids: None,
        }
    }

    #[tokio::test]
    async fn test_search_applies_limit_and_records() {
        let indexer = MockIndexer::new();
        indexer
            .set_results(vec![
                fixtures::raw_candidate("A", "aaa", 1),
                fixtures::raw_candidate("B", "bbb", 2),
            ])
            .await;

        let results = indexer.search(&query(1)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(indexer.search_count(), 1);
        assert_eq!(indexer.recorded_searches().await[0].query, "movie");
    }

    #[tokio::test]
    async fn test_error_injection_is_consumed() {
        let indexer = MockIndexer::new();
        indexer
            .set_next_error(SearchError::ConnectionFailed("down".into()))
            .await;
        assert!(indexer.search(&query(10)).await.is_err());
        assert!(indexer.search(&query(10)).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_error() {
        let indexer = MockIndexer::new();
        assert_eq!(indexer.list_indexers().await.unwrap().len(), 2);
        indexer.set_list_error(Some("down")).await;
        assert!(indexer.list_indexers().await.is_err());
        assert_eq!(indexer.list_count(), 2);
    }
}
