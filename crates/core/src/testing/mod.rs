//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every external collaborator,
//! so the resolution pipeline can be exercised without Prowlarr, SQLite files,
//! IMDb or Redis.
//!
//! # Example
//!
//! ```rust,ignore
//! use mirador_core::testing::{fixtures, MockIndexer, MockStreamStore};
//!
//! let indexer = MockIndexer::new();
//! indexer.set_results(vec![fixtures::raw_candidate("Movie 1080p", "abc", 10)]).await;
//!
//! let store = MockStreamStore::new();
//! store.insert(fixtures::records(&content, "def", 5));
//! ```

mod failing_cache;
mod mock_indexer;
mod mock_magnet;
mod mock_store;
mod mock_title;

pub use failing_cache::{FailingCacheBackend, StallingCacheBackend};
pub use mock_indexer::MockIndexer;
pub use mock_magnet::MockMagnetResolver;
pub use mock_store::MockStreamStore;
pub use mock_title::MockTitleResolver;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    use crate::cache::MemoryBackend;
    use crate::content::ContentId;
    use crate::searcher::RawCandidate;
    use crate::store::{FileRecord, TorrentRecord};
    use crate::stream::StreamCandidate;

    pub const GB: u64 = 1024 * 1024 * 1024;

    /// Create a stream candidate with reasonable defaults.
    pub fn candidate(content_key: &str, info_hash: &str, seeders: u32) -> StreamCandidate {
        StreamCandidate {
            content_key: content_key.to_string(),
            info_hash: info_hash.to_string(),
            file_index: Some(0),
            provider: "mock-indexer".to_string(),
            title: "Fixture Movie 2020 1080p".to_string(),
            size_bytes: GB,
            upload_date: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single(),
            seeders,
            trackers: Vec::new(),
            languages: Vec::new(),
            resolution: Some("1080p".to_string()),
        }
    }

    /// Create a stored torrent and its single file for `content`.
    pub fn records(
        content: &ContentId,
        info_hash: &str,
        seeders: u32,
    ) -> (TorrentRecord, FileRecord) {
        let title = format!("Fixture {} 1080p", content.key());
        let torrent = TorrentRecord {
            info_hash: info_hash.to_string(),
            provider: "mock-indexer".to_string(),
            torrent_id: None,
            title: title.clone(),
            size_bytes: GB,
            content_type: content.content_type(),
            upload_date: Utc
                .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            seeders,
            trackers: Vec::new(),
            languages: Vec::new(),
            resolution: Some("1080p".to_string()),
        };
        let file = FileRecord::for_content(content, info_hash, 0, &title, GB);
        (torrent, file)
    }

    /// 40-character info hash for a short hex `label`, zero-padded on the left.
    pub fn info_hash(label: &str) -> String {
        format!("{:0>40}", label.to_lowercase())
    }

    /// Create a raw indexer result carrying the info hash of `label`.
    pub fn raw_candidate(title: &str, label: &str, seeders: u32) -> RawCandidate {
        let info_hash = info_hash(label);
        RawCandidate {
            title: title.to_string(),
            indexer: "mock-indexer".to_string(),
            size_bytes: GB,
            seeders,
            magnet_url: Some(format!("magnet:?xt=urn:btih:{}", info_hash)),
            info_hash: Some(info_hash),
            ..Default::default()
        }
    }

    /// Poll `backend` until `key` is present, returning its remaining TTL.
    ///
    /// Stream-tier writes run on their own task, so tests wait for them.
    pub async fn wait_for_ttl(backend: &MemoryBackend, key: &str) -> Option<Duration> {
        for _ in 0..100 {
            if let Some(ttl) = backend.ttl(key).await {
                return Some(ttl);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}
