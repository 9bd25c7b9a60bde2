//! IMDb suggestion endpoint client.
//!
//! The endpoint answers JSONP (`imdb$tt0111161({...})`), so the JSON body is
//! cut out of the callback before parsing.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{MetadataError, TitleResolver};
use crate::config::MetadataConfig;

pub struct ImdbSuggestClient {
    client: Client,
    base_url: String,
}

impl ImdbSuggestClient {
    pub fn new(config: &MetadataConfig) -> Result<Self, MetadataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;
        Ok(Self {
            client,
            base_url: config.imdb_suggest_url.trim_end_matches('/').to_string(),
        })
    }

    fn suggest_url(&self, imdb_id: &str) -> String {
        format!("{}/a/{}.json", self.base_url, imdb_id)
    }
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    d: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    id: String,
    #[serde(default)]
    l: Option<String>,
}

/// Title of the suggestion whose id is exactly `imdb_id`.
fn parse_jsonp(body: &str, imdb_id: &str) -> Result<String, MetadataError> {
    let start = body
        .find('(')
        .ok_or_else(|| MetadataError::ParseError("missing JSONP callback".to_string()))?;
    let end = body
        .rfind(')')
        .filter(|end| *end > start)
        .ok_or_else(|| MetadataError::ParseError("unterminated JSONP callback".to_string()))?;

    let response: SuggestResponse = serde_json::from_str(&body[start + 1..end])
        .map_err(|e| MetadataError::ParseError(e.to_string()))?;

    response
        .d
        .into_iter()
        .find(|s| s.id == imdb_id)
        .and_then(|s| s.l)
        .filter(|title| !title.trim().is_empty())
        .ok_or_else(|| MetadataError::NotFound(imdb_id.to_string()))
}

#[async_trait]
impl TitleResolver for ImdbSuggestClient {
    fn name(&self) -> &str {
        "imdb"
    }

    async fn lookup_title(&self, imdb_id: &str) -> Result<String, MetadataError> {
        let url = self.suggest_url(imdb_id);
        debug!(imdb_id, url = %url, "Fetching IMDb suggestions");

        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound(imdb_id.to_string()));
        }
        let body = response.error_for_status()?.text().await?;
        parse_jsonp(&body, imdb_id)
    }
}
