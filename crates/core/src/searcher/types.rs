//! Types for the indexer search system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::ContentType;

/// Newznab category used to scope an indexer search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    Movies,
    Tv,
}

impl SearchCategory {
    pub fn id(&self) -> u32 {
        match self {
            SearchCategory::Movies => 2000,
            SearchCategory::Tv => 5000,
        }
    }
}

impl From<ContentType> for SearchCategory {
    fn from(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Movie => SearchCategory::Movies,
            ContentType::Series => SearchCategory::Tv,
        }
    }
}

/// Query parameters for an indexer search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search query.
    pub query: String,
    pub category: SearchCategory,
    /// Maximum results to return.
    pub limit: u32,
    /// Optional: limit to specific indexers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_ids: Option<Vec<i64>>,
}

/// Raw result from the indexer, before magnet resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub title: String,
    /// Indexer that listed the result.
    pub indexer: String,
    /// Indexer-specific identifier of the listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub size_bytes: u64,
    pub seeders: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    /// Download link, usually redirecting to the magnet URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnet_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
}

/// An indexer configured in the aggregation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerInfo {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
}

/// Errors that can occur during search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search backend API error: {0}")]
    ApiError(String),

    #[error("Search backend not configured: {0}")]
    NotConfigured(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else if e.is_connect() {
            SearchError::ConnectionFailed(e.to_string())
        } else {
            SearchError::ApiError(e.to_string())
        }
    }
}

/// Indexer aggregation service.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Execute a search across the configured indexers.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawCandidate>, SearchError>;

    /// List the indexers known to the service.
    async fn list_indexers(&self) -> Result<Vec<IndexerInfo>, SearchError>;
}

/// Turns a raw result into a magnet URI.
#[async_trait]
pub trait MagnetResolver: Send + Sync {
    /// Magnet URI for the candidate, or `None` when it cannot be obtained.
    async fn resolve_magnet(&self, candidate: &RawCandidate) -> Option<String>;
}
