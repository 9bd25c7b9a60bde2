//! Magnet URI helpers and redirect-based magnet resolution.

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use super::{MagnetResolver, RawCandidate, SearchError};

const MAGNET_PREFIX: &str = "magnet:";
const BTIH_PREFIX: &str = "urn:btih:";
/// Some indexer proxies only answer with a redirect to curl-like clients.
const RESOLVER_USER_AGENT: &str = "curl/8.12.1";

fn magnet_params(magnet: &str) -> impl Iterator<Item = (&str, &str)> {
    let query = magnet
        .strip_prefix(MAGNET_PREFIX)
        .unwrap_or("")
        .trim_start_matches('?');
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
}

/// Lowercase hex info_hash of a magnet URI.
///
/// Accepts 40-character hex and 32-character base32 `btih` hashes.
pub fn extract_info_hash(magnet: &str) -> Option<String> {
    magnet_params(magnet)
        .filter(|(key, _)| *key == "xt")
        .find_map(|(_, value)| {
            let hash = value
                .get(..BTIH_PREFIX.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(BTIH_PREFIX))
                .map(|_| &value[BTIH_PREFIX.len()..])?;
            normalize_info_hash(hash)
        })
}

/// Lowercase hex form of a 40-character hex or 32-character base32 info hash.
pub(crate) fn normalize_info_hash(hash: &str) -> Option<String> {
    match hash.len() {
        40 if hash.bytes().all(|b| b.is_ascii_hexdigit()) => Some(hash.to_lowercase()),
        32 => base32_to_hex(hash),
        _ => None,
    }
}

fn base32_to_hex(input: &str) -> Option<String> {
    let mut bits: u64 = 0;
    let mut bit_count = 0;
    let mut out = String::with_capacity(40);
    for c in input.bytes() {
        let value = match c.to_ascii_uppercase() {
            b @ b'A'..=b'Z' => b - b'A',
            b @ b'2'..=b'7' => b - b'2' + 26,
            _ => return None,
        };
        bits = (bits << 5) | u64::from(value);
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push_str(&format!("{:02x}", (bits >> bit_count) & 0xff));
        }
    }
    Some(out)
}

/// Decoded `tr=` tracker URLs of a magnet URI.
pub fn extract_trackers(magnet: &str) -> Vec<String> {
    magnet_params(magnet)
        .filter(|(key, _)| *key == "tr")
        .filter_map(|(_, value)| urlencoding::decode(value).ok())
        .map(|tracker| tracker.into_owned())
        .filter(|tracker| !tracker.is_empty())
        .collect()
}

/// Build a magnet URI from stored torrent details.
pub fn build_magnet_link(info_hash: &str, title: Option<&str>, trackers: &[String]) -> String {
    let mut link = format!("{MAGNET_PREFIX}?xt={BTIH_PREFIX}{}", info_hash.to_lowercase());
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        link.push_str("&dn=");
        link.push_str(&urlencoding::encode(title));
    }
    for tracker in trackers {
        link.push_str("&tr=");
        link.push_str(&urlencoding::encode(tracker));
    }
    link
}

/// Resolves magnets by reading the redirect of an indexer download link.
pub struct HttpMagnetResolver {
    client: Client,
}

impl HttpMagnetResolver {
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent(RESOLVER_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn follow_download_link(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "Download link request failed");
                return None;
            }
        };

        let status = response.status();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|location| location.starts_with(MAGNET_PREFIX))
            .map(str::to_string);

        if location.is_none() {
            if status == StatusCode::OK {
                debug!(url, "Download link served a file instead of a magnet redirect");
            } else {
                debug!(url, status = %status, "No magnet in download link redirect");
            }
        }
        location
    }
}

#[async_trait]
impl MagnetResolver for HttpMagnetResolver {
    async fn resolve_magnet(&self, candidate: &RawCandidate) -> Option<String> {
        if let Some(magnet) = candidate
            .magnet_url
            .as_deref()
            .filter(|m| m.starts_with(MAGNET_PREFIX))
        {
            return Some(magnet.to_string());
        }

        let url = candidate.download_url.as_deref()?;
        if url.starts_with(MAGNET_PREFIX) {
            return Some(url.to_string());
        }
        self.follow_download_link(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";

    #[test]
    fn test_extract_hex_info_hash() {
        let magnet = format!(
            "magnet:?xt=urn:btih:{}&dn=Movie",
            HASH.to_uppercase()
        );
        assert_eq!(extract_info_hash(&magnet).as_deref(), Some(HASH));
    }

    #[test]
    fn test_extract_base32_info_hash() {
        let magnet = "magnet:?xt=urn:btih:YEX6DQDLXISUVHOJ6UM3GNNKPQJWPKEK&dn=Movie";
        assert_eq!(extract_info_hash(magnet).as_deref(), Some(HASH));
    }

    #[test]
    fn test_extract_info_hash_invalid() {
        assert!(extract_info_hash("magnet:?dn=Movie").is_none());
        assert!(extract_info_hash("magnet:?xt=urn:btih:nothex").is_none());
        assert!(extract_info_hash("https://example.com").is_none());
    }

    #[test]
    fn test_extract_trackers() {
        let magnet = format!(
            "magnet:?xt=urn:btih:{HASH}&tr=udp%3A%2F%2Ftracker.one%3A80&dn=x&tr=http%3A%2F%2Ftracker.two%2Fannounce"
        );
        assert_eq!(
            extract_trackers(&magnet),
            vec![
                "udp://tracker.one:80".to_string(),
                "http://tracker.two/announce".to_string()
            ]
        );
    }

    #[test]
    fn test_build_magnet_link_round_trips_trackers() {
        let trackers = vec!["udp://tracker.one:80".to_string()];
        let link = build_magnet_link(HASH, Some("The Movie"), &trackers);
        assert!(link.starts_with(&format!("magnet:?xt=urn:btih:{HASH}")));
        assert!(link.contains("&dn=The%20Movie"));
        assert_eq!(extract_info_hash(&link).as_deref(), Some(HASH));
        assert_eq!(extract_trackers(&link), trackers);
    }

    #[tokio::test]
    async fn test_resolver_prefers_magnet_url() {
        let resolver = HttpMagnetResolver::new(Duration::from_secs(1)).unwrap();
        let candidate = RawCandidate {
            title: "Movie".to_string(),
            magnet_url: Some(format!("magnet:?xt=urn:btih:{HASH}")),
            download_url: Some("http://127.0.0.1:9/never".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolver.resolve_magnet(&candidate).await,
            Some(format!("magnet:?xt=urn:btih:{HASH}"))
        );
    }

    #[tokio::test]
    async fn test_resolver_without_links_is_none() {
        let resolver = HttpMagnetResolver::new(Duration::from_secs(1)).unwrap();
        let candidate = RawCandidate {
            title: "Movie".to_string(),
            ..Default::default()
        };
        assert!(resolver.resolve_magnet(&candidate).await.is_none());
    }
}
