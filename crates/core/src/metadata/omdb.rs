//! OMDb API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{MetadataError, TitleResolver};
use crate::config::MetadataConfig;

pub struct OmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OmdbClient {
    pub fn new(config: &MetadataConfig, api_key: &str) -> Result<Self, MetadataError> {
        if api_key.trim().is_empty() {
            return Err(MetadataError::NotConfigured(
                "OMDb API key is required".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;
        Ok(Self {
            client,
            base_url: config.omdb_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl OmdbResponse {
    fn into_title(self, imdb_id: &str) -> Result<String, MetadataError> {
        if self.response.as_deref() == Some("False") {
            return Err(MetadataError::NotFound(format!(
                "{} ({})",
                imdb_id,
                self.error.unwrap_or_default()
            )));
        }
        self.title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| MetadataError::NotFound(imdb_id.to_string()))
    }
}

#[async_trait]
impl TitleResolver for OmdbClient {
    fn name(&self) -> &str {
        "omdb"
    }

    async fn lookup_title(&self, imdb_id: &str) -> Result<String, MetadataError> {
        let response: OmdbResponse = self
            .client
            .get(&self.base_url)
            .query(&[("i", imdb_id), ("apikey", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| MetadataError::ParseError(e.to_string()))?;
        response.into_title(imdb_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            OmdbClient::new(&MetadataConfig::default(), " "),
            Err(MetadataError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_response_title() {
        let found: OmdbResponse =
            serde_json::from_str(r#"{"Title":"The Godfather","Year":"1972","Response":"True"}"#)
                .unwrap();
        assert_eq!(found.into_title("tt0068646").unwrap(), "The Godfather");

        let missing: OmdbResponse =
            serde_json::from_str(r#"{"Response":"False","Error":"Incorrect IMDb ID."}"#).unwrap();
        assert!(matches!(
            missing.into_title("tt0"),
            Err(MetadataError::NotFound(_))
        ));
    }
}
