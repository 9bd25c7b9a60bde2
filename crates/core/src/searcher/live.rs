//! Live indexer search feeding the stream store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::config::IndexerConfig;
use crate::content::{ContentId, ContentType};
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS, SEARCH_RESULTS};
use crate::store::{to_candidate, FileRecord, StreamStore, TorrentRecord};
use crate::stream::{detect_languages, detect_resolution, StreamCandidate};

use super::magnet::{extract_info_hash, extract_trackers, normalize_info_hash};
use super::merge::merge_by_info_hash;
use super::{Indexer, MagnetResolver, RawCandidate, SearchCategory, SearchError, SearchQuery};

/// Searches the indexer for one piece of content and persists what it finds.
pub struct LiveSearch {
    indexer: Arc<dyn Indexer>,
    magnets: Arc<dyn MagnetResolver>,
    store: Arc<dyn StreamStore>,
    search_limit: u32,
    parallel_requests: usize,
}

impl LiveSearch {
    pub fn new(
        indexer: Arc<dyn Indexer>,
        magnets: Arc<dyn MagnetResolver>,
        store: Arc<dyn StreamStore>,
        config: &IndexerConfig,
    ) -> Self {
        Self {
            indexer,
            magnets,
            store,
            search_limit: config.search_limit,
            parallel_requests: config.parallel_requests.max(1),
        }
    }

    pub fn indexer(&self) -> &Arc<dyn Indexer> {
        &self.indexer
    }

    /// Indexer query for `content` whose title is `title`.
    ///
    /// Episodes are searched as `Title S01E02`.
    pub fn build_query(&self, content: &ContentId, title: &str) -> SearchQuery {
        let query = match (content.content_type(), content.season(), content.episode()) {
            (ContentType::Series, Some(season), Some(episode)) => {
                format!("{} S{:02}E{:02}", title, season, episode)
            }
            _ => title.to_string(),
        };
        SearchQuery {
            query,
            category: SearchCategory::from(content.content_type()),
            limit: self.search_limit,
            indexer_ids: None,
        }
    }

    /// Run the search, store the new torrents and merge them into `prior`.
    ///
    /// Store write failures are logged and do not fail the search.
    pub async fn search(
        &self,
        content: &ContentId,
        title: &str,
        prior: Vec<StreamCandidate>,
    ) -> Result<Vec<StreamCandidate>, SearchError> {
        let query = self.build_query(content, title);
        let start = Instant::now();

        let raw = match self.indexer.search(&query).await {
            Ok(raw) => {
                record_indexer_call(self.indexer.name(), "success", start);
                raw
            }
            Err(e) => {
                record_indexer_call(self.indexer.name(), "error", start);
                return Err(e);
            }
        };
        SEARCH_RESULTS.with_label_values(&[]).observe(raw.len() as f64);

        let (torrents, files) = self.build_records(content, raw).await;
        let fresh: Vec<StreamCandidate> = torrents
            .iter()
            .zip(files.iter())
            .map(|(torrent, file)| to_candidate(content.key(), torrent, file))
            .collect();

        if !torrents.is_empty() {
            if let Err(e) = self.store.upsert(&torrents, &files) {
                warn!(content_id = %content.key(), error = %e, "Failed to store live search results");
            }
        }

        info!(
            content_id = %content.key(),
            query = %query.query,
            found = fresh.len(),
            prior = prior.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Live search complete"
        );

        Ok(merge_by_info_hash(prior, fresh))
    }

    /// Resolve magnets in batches and turn the results into store rows.
    ///
    /// Results without a well-formed info hash, from the indexer or the
    /// magnet, are skipped.
    async fn build_records(
        &self,
        content: &ContentId,
        raw: Vec<RawCandidate>,
    ) -> (Vec<TorrentRecord>, Vec<FileRecord>) {
        let mut torrents = Vec::new();
        let mut files = Vec::new();
        let mut seen = HashSet::new();

        for batch in raw.chunks(self.parallel_requests) {
            let magnets = join_all(
                batch
                    .iter()
                    .map(|candidate| self.magnets.resolve_magnet(candidate)),
            )
            .await;

            for (candidate, magnet) in batch.iter().zip(magnets) {
                let info_hash = candidate
                    .info_hash
                    .as_deref()
                    .and_then(|h| normalize_info_hash(h.trim()))
                    .or_else(|| magnet.as_deref().and_then(extract_info_hash));

                let Some(info_hash) = info_hash else {
                    debug!(title = %candidate.title, indexer = %candidate.indexer, "Skipping result without info hash");
                    continue;
                };
                if !seen.insert(info_hash.clone()) {
                    continue;
                }

                let trackers = magnet.as_deref().map(extract_trackers).unwrap_or_default();
                torrents.push(TorrentRecord {
                    info_hash: info_hash.clone(),
                    provider: candidate.indexer.clone(),
                    torrent_id: candidate.guid.clone(),
                    title: candidate.title.clone(),
                    size_bytes: candidate.size_bytes,
                    content_type: content.content_type(),
                    upload_date: candidate.publish_date.unwrap_or_else(Utc::now),
                    seeders: candidate.seeders,
                    trackers,
                    languages: detect_languages(&candidate.title),
                    resolution: detect_resolution(&candidate.title),
                });
                files.push(FileRecord::for_content(
                    content,
                    &info_hash,
                    0,
                    &candidate.title,
                    candidate.size_bytes,
                ));
            }
        }

        (torrents, files)
    }
}

fn record_indexer_call(service: &str, status: &str, start: Instant) {
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, "search", status])
        .inc();
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, "search"])
        .observe(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStreamStore;
    use crate::testing::{fixtures, MockIndexer, MockMagnetResolver};

    const HASH_A: &str = "c12fe1c06bba254a9dc9f519b335aa7c1367a88a";
    const HASH_B: &str = "0000000000000000000000000000000000000b0b";

    fn config() -> IndexerConfig {
        IndexerConfig {
            url: "http://prowlarr:9696".to_string(),
            api_key: "key".to_string(),
            timeout_secs: 30,
            search_limit: 100,
            parallel_requests: 2,
        }
    }

    fn live(indexer: Arc<MockIndexer>, store: Arc<SqliteStreamStore>) -> LiveSearch {
        LiveSearch::new(indexer, Arc::new(MockMagnetResolver::new()), store, &config())
    }

    #[test]
    fn test_build_query() {
        let search = live(
            Arc::new(MockIndexer::new()),
            Arc::new(SqliteStreamStore::in_memory().unwrap()),
        );
        let movie = ContentId::parse(ContentType::Movie, "tt0111161").unwrap();
        let query = search.build_query(&movie, "The Shawshank Redemption");
        assert_eq!(query.query, "The Shawshank Redemption");
        assert_eq!(query.category, SearchCategory::Movies);
        assert_eq!(query.limit, 100);

        let episode = ContentId::parse(ContentType::Series, "tt0903747:1:2").unwrap();
        let query = search.build_query(&episode, "Breaking Bad");
        assert_eq!(query.query, "Breaking Bad S01E02");
        assert_eq!(query.category, SearchCategory::Tv);
    }

    #[tokio::test]
    async fn test_search_stores_and_merges() {
        let indexer = Arc::new(MockIndexer::new());
        indexer
            .set_results(vec![
                RawCandidate {
                    title: "Movie.2020.1080p.FRENCH".to_string(),
                    indexer: "YTS".to_string(),
                    seeders: 30,
                    size_bytes: 1000,
                    magnet_url: Some(format!(
                        "magnet:?xt=urn:btih:{HASH_A}&tr=udp%3A%2F%2Ftracker.one%3A80"
                    )),
                    ..Default::default()
                },
                RawCandidate {
                    title: "Movie.2020.720p".to_string(),
                    indexer: "EZTV".to_string(),
                    seeders: 5,
                    info_hash: Some(HASH_B.to_string()),
                    ..Default::default()
                },
                RawCandidate {
                    title: "No hash anywhere".to_string(),
                    indexer: "EZTV".to_string(),
                    ..Default::default()
                },
            ])
            .await;
        let store = Arc::new(SqliteStreamStore::in_memory().unwrap());
        let search = live(indexer.clone(), store.clone());
        let content = ContentId::parse(ContentType::Movie, "tt0111161").unwrap();
        let prior = vec![fixtures::candidate("tt0111161", HASH_B, 99)];

        let merged = search.search(&content, "Movie", prior).await.unwrap();

        assert_eq!(indexer.search_count(), 1);
        assert_eq!(merged.len(), 2);
        // stored record wins over the fresh duplicate
        let b = merged.iter().find(|c| c.info_hash == HASH_B).unwrap();
        assert_eq!(b.seeders, 99);

        let stored = store.query_by_content(&content).unwrap();
        assert_eq!(stored.len(), 2);
        let a = stored.iter().find(|c| c.info_hash == HASH_A).unwrap();
        assert_eq!(a.trackers, vec!["udp://tracker.one:80".to_string()]);
        assert_eq!(a.languages, vec!["french".to_string()]);
        assert_eq!(a.resolution.as_deref(), Some("1080p"));
        assert_eq!(a.provider, "YTS");
    }

    #[tokio::test]
    async fn test_malformed_indexer_hash_is_rejected() {
        let indexer = Arc::new(MockIndexer::new());
        indexer
            .set_results(vec![
                RawCandidate {
                    title: "Bogus hash".to_string(),
                    indexer: "EZTV".to_string(),
                    info_hash: Some("not-a-hash".to_string()),
                    ..Default::default()
                },
                RawCandidate {
                    title: "Bogus hash, good magnet".to_string(),
                    indexer: "EZTV".to_string(),
                    info_hash: Some("1234".to_string()),
                    magnet_url: Some(format!("magnet:?xt=urn:btih:{HASH_A}")),
                    ..Default::default()
                },
                RawCandidate {
                    title: "Uppercase hash".to_string(),
                    indexer: "YTS".to_string(),
                    info_hash: Some(format!(" {} ", HASH_B.to_uppercase())),
                    ..Default::default()
                },
            ])
            .await;
        let store = Arc::new(SqliteStreamStore::in_memory().unwrap());
        let search = live(indexer, store.clone());
        let content = ContentId::parse(ContentType::Movie, "tt0111161").unwrap();

        let results = search.search(&content, "Movie", Vec::new()).await.unwrap();

        let mut hashes: Vec<&str> = results.iter().map(|c| c.info_hash.as_str()).collect();
        hashes.sort();
        assert_eq!(hashes, vec![HASH_B, HASH_A]);
        assert!(store.get_torrent("not-a-hash").unwrap().is_none());
        assert_eq!(store.query_by_content(&content).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_propagates_indexer_error() {
        let indexer = Arc::new(MockIndexer::new());
        indexer
            .set_next_error(SearchError::ConnectionFailed("down".into()))
            .await;
        let search = live(indexer, Arc::new(SqliteStreamStore::in_memory().unwrap()));
        let content = ContentId::parse(ContentType::Movie, "tt0111161").unwrap();

        let result = search.search(&content, "Movie", Vec::new()).await;
        assert!(matches!(result, Err(SearchError::ConnectionFailed(_))));
    }
}
