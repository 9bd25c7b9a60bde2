//! Mock stream store for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::content::{ContentId, ContentSource};
use crate::store::{
    to_candidate, FileRecord, StoreError, StreamStore, TorrentRecord, QUERY_LIMIT,
};
use crate::stream::StreamCandidate;

/// In-memory StreamStore that counts calls and can be told to fail.
#[derive(Default)]
pub struct MockStreamStore {
    torrents: Mutex<Vec<TorrentRecord>>,
    files: Mutex<Vec<FileRecord>>,
    fail_queries: AtomicBool,
    fail_upserts: AtomicBool,
    query_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
}

impl MockStreamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one (torrent, file) pair without counting it as an upsert.
    pub fn insert(&self, (torrent, file): (TorrentRecord, FileRecord)) {
        if let Ok(mut torrents) = self.torrents.lock() {
            torrents.retain(|t| t.info_hash != torrent.info_hash);
            torrents.push(torrent);
        }
        if let Ok(mut files) = self.files.lock() {
            files.push(file);
        }
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_count(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn torrent_count(&self) -> usize {
        self.torrents.lock().map(|t| t.len()).unwrap_or(0)
    }
}

fn matches(file: &FileRecord, content: &ContentId) -> bool {
    match content.source() {
        ContentSource::Imdb {
            id,
            season,
            episode,
        } => {
            file.imdb_id.as_deref() == Some(id.as_str())
                && (season.is_none() || file.imdb_season == *season)
                && (episode.is_none() || file.imdb_episode == *episode)
        }
        ContentSource::Kitsu { id, episode } => {
            file.kitsu_id == Some(*id) && (episode.is_none() || file.kitsu_episode == *episode)
        }
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Database(format!("Lock poisoned: {}", e))
}

impl StreamStore for MockStreamStore {
    fn query_by_content(&self, content: &ContentId) -> Result<Vec<StreamCandidate>, StoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Database("mock query failure".to_string()));
        }

        let torrents = self.torrents.lock().map_err(lock_err)?;
        let files = self.files.lock().map_err(lock_err)?;
        let mut results: Vec<StreamCandidate> = files
            .iter()
            .filter(|f| matches(f, content))
            .filter_map(|f| {
                torrents
                    .iter()
                    .find(|t| t.info_hash == f.info_hash)
                    .map(|t| to_candidate(content.key(), t, f))
            })
            .collect();
        results.sort_by(|a, b| b.seeders.cmp(&a.seeders));
        results.truncate(QUERY_LIMIT as usize);
        Ok(results)
    }

    fn upsert(&self, torrents: &[TorrentRecord], files: &[FileRecord]) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database("mock upsert failure".to_string()));
        }

        let mut stored_torrents = self.torrents.lock().map_err(lock_err)?;
        for torrent in torrents {
            stored_torrents.retain(|t| t.info_hash != torrent.info_hash);
            stored_torrents.push(torrent.clone());
        }
        let mut stored_files = self.files.lock().map_err(lock_err)?;
        for file in files {
            stored_files
                .retain(|f| !(f.info_hash == file.info_hash && f.file_index == file.file_index));
            stored_files.push(file.clone());
        }
        Ok(())
    }

    fn get_torrent(&self, info_hash: &str) -> Result<Option<TorrentRecord>, StoreError> {
        let torrents = self.torrents.lock().map_err(lock_err)?;
        Ok(torrents
            .iter()
            .find(|t| t.info_hash.eq_ignore_ascii_case(info_hash))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentType;
    use crate::testing::fixtures;

    #[test]
    fn test_query_matches_content_and_sorts() {
        let store = MockStreamStore::new();
        let movie = ContentId::parse(ContentType::Movie, "tt0111161").unwrap();
        let other = ContentId::parse(ContentType::Movie, "tt0068646").unwrap();
        store.insert(fixtures::records(&movie, "aaa", 1));
        store.insert(fixtures::records(&movie, "bbb", 9));
        store.insert(fixtures::records(&other, "ccc", 5));

        let results = store.query_by_content(&movie).unwrap();
        let hashes: Vec<_> = results.iter().map(|c| c.info_hash.as_str()).collect();
        assert_eq!(hashes, vec!["bbb", "aaa"]);
        assert_eq!(store.query_count(), 1);
    }

    #[test]
    fn test_failure_injection() {
        let store = MockStreamStore::new();
        let movie = ContentId::parse(ContentType::Movie, "tt0111161").unwrap();
        store.set_fail_queries(true);
        assert!(store.query_by_content(&movie).is_err());
        store.set_fail_upserts(true);
        let (t, f) = fixtures::records(&movie, "aaa", 1);
        assert!(store.upsert(&[t], &[f]).is_err());
        assert_eq!(store.torrent_count(), 0);
    }
}
