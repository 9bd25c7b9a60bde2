//! Durable torrent/file records keyed by content id.
//!
//! Live searches persist what they find here so that later requests for the
//! same content can skip the indexer.

mod sqlite;
mod types;

pub use sqlite::SqliteStreamStore;
pub use types::*;

use crate::content::ContentId;
use crate::stream::StreamCandidate;

/// Trait for stream record storage.
pub trait StreamStore: Send + Sync {
    /// Stored candidates for a content id, best seeded first.
    fn query_by_content(&self, content: &ContentId) -> Result<Vec<StreamCandidate>, StoreError>;

    /// Insert or update torrents and their files in one transaction.
    ///
    /// Either every row commits or none does.
    fn upsert(&self, torrents: &[TorrentRecord], files: &[FileRecord]) -> Result<(), StoreError>;

    /// Get a specific torrent by info_hash.
    fn get_torrent(&self, info_hash: &str) -> Result<Option<TorrentRecord>, StoreError>;
}
