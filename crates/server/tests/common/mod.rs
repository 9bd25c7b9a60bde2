//! Common test utilities for in-process HTTP testing with mocks.
//!
//! The fixture wires a real router and resolver to mock collaborators, so
//! stream requests can be exercised end to end without Prowlarr, IMDb,
//! Redis or a database file.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use mirador_core::config::IndexerConfig;
use mirador_core::testing::{MockIndexer, MockMagnetResolver, MockStreamStore, MockTitleResolver};
use mirador_core::{
    Config, Indexer, LiveSearch, MemoryBackend, ProviderRegistry, ResolverSettings, RetryPolicy,
    StreamResolver, TieredCache,
};
use mirador_server::state::AppState;

/// Re-export fixtures for test convenience
pub use mirador_core::testing::fixtures;

pub const SHAWSHANK: &str = "tt0111161";

/// In-process server with controllable mocks.
pub struct TestFixture {
    pub router: Router,
    pub resolver: Arc<StreamResolver>,
    pub indexer: Arc<MockIndexer>,
    pub store: Arc<MockStreamStore>,
    pub titles: Arc<MockTitleResolver>,
    pub backend: Arc<MemoryBackend>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Accepted API keys; empty leaves the stream routes open
    pub api_keys: Vec<String>,
}

impl TestConfig {
    pub fn with_api_keys(keys: &[&str]) -> Self {
        Self {
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let mut config = Config::default();
        config.server.api_keys = test_config.api_keys;

        let indexer = Arc::new(MockIndexer::new());
        let store = Arc::new(MockStreamStore::new());
        let titles = Arc::new(MockTitleResolver::new());
        titles.set_title(SHAWSHANK, "The Shawshank Redemption").await;
        let backend = Arc::new(MemoryBackend::new());

        let indexer_config = IndexerConfig {
            url: "http://prowlarr:9696".to_string(),
            api_key: "test-key".to_string(),
            timeout_secs: 5,
            search_limit: 100,
            parallel_requests: 4,
        };
        let live = LiveSearch::new(
            indexer.clone(),
            Arc::new(MockMagnetResolver::new()),
            store.clone(),
            &indexer_config,
        );
        let registry = Arc::new(ProviderRegistry::new(
            Some(indexer.clone() as Arc<dyn Indexer>),
            Duration::from_secs(300),
        ));

        let resolver = Arc::new(StreamResolver::new(
            TieredCache::new(
                backend.clone(),
                RetryPolicy {
                    max_attempts: 1,
                    delay: Duration::ZERO,
                },
            ),
            store.clone(),
            titles.clone(),
            Some(live),
            registry,
            ResolverSettings {
                search_timeout: Duration::from_secs(2),
                ..ResolverSettings::default()
            },
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&resolver)));
        let router = mirador_server::api::create_router(state);

        Self {
            router,
            resolver,
            indexer,
            store,
            titles,
            backend,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            text,
            body,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
