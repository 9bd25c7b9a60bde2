use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::StreamCandidate;
use super::static_links::is_static_url;
use super::title::{binge_group, quality_label};

/// Client cache lifetime for a non-empty response, in seconds.
pub const CACHE_MAX_AGE: u64 = 60 * 60;
pub const STALE_REVALIDATE_AGE: u64 = 4 * 60 * 60;
pub const STALE_ERROR_AGE: u64 = 7 * 24 * 60 * 60;

const ADDON_NAME: &str = "Mirador";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binge_group: Option<String>,
}

/// A stream as returned to the client.
///
/// Built once from a [`StreamCandidate`] by [`to_resolved_stream`]. The skipped
/// fields feed the filter and sort stages and are not part of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStream {
    pub name: String,
    pub title: String,
    pub info_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_idx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default)]
    pub behavior_hints: BehaviorHints,

    #[serde(skip)]
    pub quality: Option<String>,
    #[serde(skip)]
    pub provider: String,
    #[serde(skip)]
    pub size_bytes: u64,
    #[serde(skip)]
    pub seeders: u32,
    #[serde(skip)]
    pub upload_date: Option<DateTime<Utc>>,
}

impl ResolvedStream {
    pub fn binge_group(&self) -> Option<&str> {
        self.behavior_hints.binge_group.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.url.as_deref().is_some_and(is_static_url)
    }
}

/// Human-readable size with binary units, e.g. `"1.5 GB"`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Pure transform from a candidate to its presentation form.
pub fn to_resolved_stream(candidate: &StreamCandidate) -> ResolvedStream {
    let quality = quality_label(candidate.resolution.as_deref(), &candidate.title);
    let name = match &quality {
        Some(q) => format!("{ADDON_NAME}\n{q}"),
        None => ADDON_NAME.to_string(),
    };

    let mut details = format!(
        "👤 {} 💾 {} ⚙️ {}",
        candidate.seeders,
        format_size(candidate.size_bytes),
        candidate.provider
    );
    if !candidate.languages.is_empty() {
        details.push('\n');
        details.push_str(&candidate.languages.join(" / "));
    }

    let info_hash = candidate.info_hash.to_lowercase();
    let sources = if candidate.trackers.is_empty() {
        Vec::new()
    } else {
        candidate
            .trackers
            .iter()
            .map(|t| format!("tracker:{t}"))
            .chain(std::iter::once(format!("dht:{info_hash}")))
            .collect()
    };

    ResolvedStream {
        name,
        title: format!("{}\n{}", candidate.title, details),
        behavior_hints: BehaviorHints {
            binge_group: Some(binge_group(quality.as_deref(), &candidate.title)),
        },
        info_hash,
        file_idx: candidate.file_index,
        url: None,
        sources,
        quality,
        provider: candidate.provider.clone(),
        size_bytes: candidate.size_bytes,
        seeders: candidate.seeders,
        upload_date: candidate.upload_date,
    }
}

/// Stream endpoint payload with client cache hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    pub streams: Vec<ResolvedStream>,
    pub cache_max_age: u64,
    pub stale_revalidate: u64,
    pub stale_error: u64,
}

impl StreamResponse {
    /// Wrap streams with cache hints.
    ///
    /// Empty lists and lists made only of placeholder videos are not cached
    /// by clients so that the next request retries.
    pub fn new(streams: Vec<ResolvedStream>) -> Self {
        let cache_max_age = if streams.is_empty() || streams.iter().all(|s| s.is_static()) {
            0
        } else {
            CACHE_MAX_AGE
        };
        Self {
            streams,
            cache_max_age,
            stale_revalidate: STALE_REVALIDATE_AGE,
            stale_error: STALE_ERROR_AGE,
        }
    }

    /// `Cache-Control` header value matching the cache hints.
    pub fn cache_control(&self) -> String {
        format!(
            "max-age={}, stale-while-revalidate={}, stale-if-error={}, public",
            self.cache_max_age, self.stale_revalidate, self.stale_error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536 * 1024 * 1024), "1.50 GB");
        assert_eq!(format_size(2 * 1024 * 1024), "2.00 MB");
    }

    #[test]
    fn test_to_resolved_stream() {
        let mut candidate = fixtures::candidate("tt0111161", "ABCDEF", 42);
        candidate.title = "The.Shawshank.Redemption.1994.1080p.HDR.BluRay".to_string();
        candidate.trackers = vec!["udp://tracker.example:80".to_string()];
        candidate.languages = vec!["multi".to_string()];
        candidate.file_index = Some(0);

        let stream = to_resolved_stream(&candidate);
        assert_eq!(stream.name, "Mirador\n1080p HDR");
        assert_eq!(stream.info_hash, "abcdef");
        assert_eq!(stream.file_idx, Some(0));
        assert_eq!(
            stream.sources,
            vec![
                "tracker:udp://tracker.example:80".to_string(),
                "dht:abcdef".to_string()
            ]
        );
        assert_eq!(stream.binge_group(), Some("mirador|1080p HDR"));
        assert!(stream
            .title
            .starts_with("The.Shawshank.Redemption.1994.1080p.HDR.BluRay\n👤 42"));
        assert!(stream.title.ends_with("\nmulti"));
        assert_eq!(stream.quality.as_deref(), Some("1080p HDR"));
    }

    #[test]
    fn test_resolved_stream_wire_format() {
        let stream = to_resolved_stream(&fixtures::candidate("tt1", "abc", 1));
        let json = serde_json::to_value(&stream).unwrap();
        assert_eq!(json["infoHash"], "abc");
        assert!(json.get("behaviorHints").is_some());
        assert!(json.get("provider").is_none());
        assert!(json.get("seeders").is_none());
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_response_cache_hints() {
        let empty = StreamResponse::new(Vec::new());
        assert_eq!(empty.cache_max_age, 0);
        assert_eq!(empty.stale_revalidate, 4 * 60 * 60);
        assert_eq!(empty.stale_error, 7 * 24 * 60 * 60);

        let stream = to_resolved_stream(&fixtures::candidate("tt1", "abc", 1));
        let full = StreamResponse::new(vec![stream.clone()]);
        assert_eq!(full.cache_max_age, 3600);
        assert_eq!(
            full.cache_control(),
            "max-age=3600, stale-while-revalidate=14400, stale-if-error=604800, public"
        );

        let mut placeholder = stream;
        placeholder.url = Some("http://host/static/videos/failed_access_v2.mp4".to_string());
        assert_eq!(StreamResponse::new(vec![placeholder]).cache_max_age, 0);
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let json = serde_json::to_value(StreamResponse::new(Vec::new())).unwrap();
        assert!(json.get("cacheMaxAge").is_some());
        assert!(json.get("staleRevalidate").is_some());
        assert!(json.get("staleError").is_some());
    }
}
