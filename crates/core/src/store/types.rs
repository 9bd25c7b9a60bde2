use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{ContentId, ContentSource, ContentType};
use crate::stream::StreamCandidate;

/// Maximum rows returned by a content query.
pub const QUERY_LIMIT: u32 = 500;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// One torrent, unique by info_hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRecord {
    pub info_hash: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_id: Option<String>,
    pub title: String,
    pub size_bytes: u64,
    pub content_type: ContentType,
    pub upload_date: DateTime<Utc>,
    pub seeders: u32,
    #[serde(default)]
    pub trackers: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// A file inside a torrent, tagged with the content it plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub info_hash: String,
    pub file_index: u32,
    pub title: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub imdb_season: Option<u32>,
    #[serde(default)]
    pub imdb_episode: Option<u32>,
    #[serde(default)]
    pub kitsu_id: Option<u64>,
    #[serde(default)]
    pub kitsu_episode: Option<u32>,
}

impl FileRecord {
    /// File record for `content`, with the content's catalog ids filled in.
    pub fn for_content(
        content: &ContentId,
        info_hash: &str,
        file_index: u32,
        title: &str,
        size_bytes: u64,
    ) -> Self {
        let mut file = FileRecord {
            info_hash: info_hash.to_string(),
            file_index,
            title: title.to_string(),
            size_bytes,
            imdb_id: None,
            imdb_season: None,
            imdb_episode: None,
            kitsu_id: None,
            kitsu_episode: None,
        };
        match content.source() {
            ContentSource::Imdb {
                id,
                season,
                episode,
            } => {
                file.imdb_id = Some(id.clone());
                file.imdb_season = *season;
                file.imdb_episode = *episode;
            }
            ContentSource::Kitsu { id, episode } => {
                file.kitsu_id = Some(*id);
                file.kitsu_episode = *episode;
            }
        }
        file
    }
}

/// Candidate view of a stored (torrent, file) pair.
pub fn to_candidate(
    content_key: &str,
    torrent: &TorrentRecord,
    file: &FileRecord,
) -> StreamCandidate {
    StreamCandidate {
        content_key: content_key.to_string(),
        info_hash: torrent.info_hash.clone(),
        file_index: Some(file.file_index),
        provider: torrent.provider.clone(),
        title: torrent.title.clone(),
        size_bytes: if file.size_bytes > 0 {
            file.size_bytes
        } else {
            torrent.size_bytes
        },
        upload_date: Some(torrent.upload_date),
        seeders: torrent.seeders,
        trackers: torrent.trackers.clone(),
        languages: torrent.languages.clone(),
        resolution: torrent.resolution.clone(),
    }
}
