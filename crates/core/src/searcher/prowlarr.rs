//! Prowlarr search backend implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::IndexerConfig;

use super::{IndexerInfo, Indexer, RawCandidate, SearchError, SearchQuery};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Prowlarr search backend implementation.
pub struct ProwlarrClient {
    client: Client,
    config: IndexerConfig,
}

impl ProwlarrClient {
    /// Create a new ProwlarrClient with the given configuration.
    pub fn new(config: IndexerConfig) -> Result<Self, SearchError> {
        if config.api_key.trim().is_empty() {
            return Err(SearchError::NotConfigured(
                "Prowlarr API key not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| SearchError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the Prowlarr API URL for a search.
    fn build_search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/api/v1/search?query={}&categories={}&type=search&limit={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&query.query),
            query.category.id(),
            query.limit.min(self.config.search_limit),
        );

        if let Some(ids) = &query.indexer_ids {
            for id in ids {
                url.push_str(&format!("&indexerIds={}", id));
            }
        }

        url
    }

    fn indexers_url(&self) -> String {
        format!("{}/api/v1/indexer", self.config.url.trim_end_matches('/'))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SearchError> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Indexer for ProwlarrClient {
    fn name(&self) -> &str {
        "prowlarr"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawCandidate>, SearchError> {
        if query.query.trim().is_empty() {
            return Err(SearchError::ApiError("Empty search query".to_string()));
        }

        let start = Instant::now();
        let url = self.build_search_url(query);
        debug!(query = %query.query, category = query.category.id(), "Searching Prowlarr");

        let results: Vec<ProwlarrResult> = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|e| SearchError::ApiError(format!("Failed to parse response: {}", e)))?;

        debug!(
            query = %query.query,
            results = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Prowlarr search complete"
        );

        Ok(results.into_iter().map(RawCandidate::from).collect())
    }

    async fn list_indexers(&self) -> Result<Vec<IndexerInfo>, SearchError> {
        let indexers: Vec<ProwlarrIndexer> = self
            .get(&self.indexers_url())
            .await?
            .json()
            .await
            .map_err(|e| SearchError::ApiError(format!("Failed to parse response: {}", e)))?;

        if indexers.is_empty() {
            warn!("Prowlarr reported no indexers");
        }

        Ok(indexers
            .into_iter()
            .map(|i| IndexerInfo {
                id: i.id,
                name: i.name,
                enabled: i.enable,
            })
            .collect())
    }
}

/// Parse Prowlarr's date format.
fn parse_prowlarr_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

// Prowlarr API response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProwlarrResult {
    title: String,
    #[serde(default)]
    indexer: Option<String>,
    #[serde(default)]
    guid: Option<String>,
    #[serde(default)]
    size: Option<i64>,
    #[serde(default)]
    seeders: Option<i64>,
    #[serde(default)]
    publish_date: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    magnet_url: Option<String>,
    #[serde(default)]
    info_hash: Option<String>,
}

impl From<ProwlarrResult> for RawCandidate {
    fn from(r: ProwlarrResult) -> Self {
        RawCandidate {
            title: r.title,
            indexer: r.indexer.unwrap_or_else(|| "unknown".to_string()),
            guid: r.guid,
            size_bytes: r.size.unwrap_or(0).max(0) as u64,
            seeders: r.seeders.unwrap_or(0).clamp(0, u32::MAX as i64) as u32,
            publish_date: r.publish_date.as_deref().and_then(parse_prowlarr_date),
            download_url: r.download_url,
            magnet_url: r.magnet_url,
            info_hash: r.info_hash.map(|h| h.to_lowercase()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProwlarrIndexer {
    id: i64,
    name: String,
    #[serde(default)]
    enable: bool,
}
