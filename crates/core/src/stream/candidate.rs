use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A playable torrent file for one piece of content.
///
/// This is the single shape shared by store reads, live-search output and
/// stream-cache payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamCandidate {
    /// Request key of the content this file belongs to.
    pub content_key: String,
    /// Info hash (lowercase hex).
    pub info_hash: String,
    /// File index inside the torrent, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_index: Option<u32>,
    /// Provider (indexer) that listed the torrent.
    pub provider: String,
    /// Torrent title.
    pub title: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
    pub seeders: u32,
    #[serde(default)]
    pub trackers: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    /// Resolution as parsed from the title (e.g. "1080p", "4k").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl StreamCandidate {
    pub fn has_info_hash(&self) -> bool {
        !self.info_hash.trim().is_empty()
    }
}

/// Default ordering: seeders descending, then most recent upload first.
pub fn sort_by_seeders_then_recency(candidates: &mut [StreamCandidate]) {
    candidates.sort_by(|a, b| {
        b.seeders
            .cmp(&a.seeders)
            .then_with(|| b.upload_date.cmp(&a.upload_date))
    });
}
