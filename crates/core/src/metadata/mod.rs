//! Title lookup for IMDb ids.
//!
//! The live search needs a human title to query the indexer with. Titles come
//! from the IMDb suggestion endpoint, with OMDb as a fallback when an API key
//! is configured.

mod imdb;
mod omdb;

pub use imdb::ImdbSuggestClient;
pub use omdb::OmdbClient;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use crate::config::MetadataConfig;
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

/// Errors that can occur when looking up a title.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("No title found for {0}")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Source of display titles for IMDb ids.
#[async_trait]
pub trait TitleResolver: Send + Sync {
    /// Source name for logs and metrics.
    fn name(&self) -> &str;

    async fn lookup_title(&self, imdb_id: &str) -> Result<String, MetadataError>;
}

/// Tries each resolver in order and returns the first title found.
pub struct FallbackTitleResolver {
    resolvers: Vec<Arc<dyn TitleResolver>>,
}

impl FallbackTitleResolver {
    pub fn new(resolvers: Vec<Arc<dyn TitleResolver>>) -> Self {
        Self { resolvers }
    }

    /// IMDb suggestions, then OMDb when `omdb_api_key` is set.
    pub fn from_config(config: &MetadataConfig) -> Result<Self, MetadataError> {
        let mut resolvers: Vec<Arc<dyn TitleResolver>> =
            vec![Arc::new(ImdbSuggestClient::new(config)?)];
        if let Some(key) = config.omdb_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            resolvers.push(Arc::new(OmdbClient::new(config, key)?));
        }
        Ok(Self::new(resolvers))
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

#[async_trait]
impl TitleResolver for FallbackTitleResolver {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn lookup_title(&self, imdb_id: &str) -> Result<String, MetadataError> {
        let mut last_error = MetadataError::NotFound(imdb_id.to_string());
        for resolver in &self.resolvers {
            let start = Instant::now();
            let result = resolver.lookup_title(imdb_id).await;
            let status = if result.is_ok() { "success" } else { "error" };
            EXTERNAL_SERVICE_REQUESTS
                .with_label_values(&[resolver.name(), "title", status])
                .inc();
            EXTERNAL_SERVICE_DURATION
                .with_label_values(&[resolver.name(), "title"])
                .observe(start.elapsed().as_secs_f64());

            match result {
                Ok(title) => return Ok(title),
                Err(e) => {
                    debug!(imdb_id, source = resolver.name(), error = %e, "Title lookup failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
