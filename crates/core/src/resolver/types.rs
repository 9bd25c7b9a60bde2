use std::time::Duration;
use thiserror::Error;

use crate::config::ResolverConfig;
use crate::content::{ContentId, ContentIdError};
use crate::store::StoreError;

/// A stream lookup for one piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub content: ContentId,
}

impl StreamRequest {
    pub fn new(content: ContentId) -> Self {
        Self { content }
    }

    /// Build a request from the raw `type` and `id` path segments.
    pub fn from_path(content_type: &str, id: &str) -> Result<Self, ResolveError> {
        Ok(Self::new(ContentId::from_request(content_type, id)?))
    }

    pub fn key(&self) -> &str {
        self.content.key()
    }
}

/// Errors surfaced by stream resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    UnsupportedContent(#[from] ContentIdError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ResolveError {
    fn from(e: StoreError) -> Self {
        ResolveError::Store(e.to_string())
    }
}

/// Tuning knobs for [`super::StreamResolver`].
#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    /// Stored results at or above this count skip the live search.
    pub min_store_results: usize,
    pub search_timeout: Duration,
    pub max_concurrent_searches: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&ResolverConfig::default())
    }
}

impl From<&ResolverConfig> for ResolverSettings {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            min_store_results: config.min_store_results,
            search_timeout: Duration::from_secs(config.search_timeout_secs),
            max_concurrent_searches: config.max_concurrent_searches.max(1),
        }
    }
}
