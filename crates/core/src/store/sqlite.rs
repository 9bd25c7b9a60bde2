//! SQLite-backed stream store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use super::{to_candidate, FileRecord, StoreError, StreamStore, TorrentRecord, QUERY_LIMIT};
use crate::content::{ContentId, ContentSource, ContentType};
use crate::stream::StreamCandidate;

/// SQLite-backed stream store.
pub struct SqliteStreamStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl SqliteStreamStore {
    /// Open the store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- One row per unique info_hash
            CREATE TABLE IF NOT EXISTS torrents (
                info_hash TEXT PRIMARY KEY,
                provider TEXT NOT NULL,
                torrent_id TEXT,
                title TEXT NOT NULL,
                size_bytes INTEGER NOT NULL DEFAULT 0,
                content_type TEXT NOT NULL,
                upload_date TEXT NOT NULL,
                seeders INTEGER NOT NULL DEFAULT 0,
                trackers TEXT NOT NULL DEFAULT '',
                languages TEXT NOT NULL DEFAULT '',
                resolution TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_torrents_seeders ON torrents(seeders);

            -- Files within torrents, tagged with the content they play
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                info_hash TEXT NOT NULL REFERENCES torrents(info_hash) ON DELETE CASCADE,
                file_index INTEGER NOT NULL,
                title TEXT NOT NULL,
                size_bytes INTEGER NOT NULL DEFAULT 0,
                imdb_id TEXT,
                imdb_season INTEGER,
                imdb_episode INTEGER,
                kitsu_id INTEGER,
                kitsu_episode INTEGER,
                UNIQUE(info_hash, file_index)
            );

            CREATE INDEX IF NOT EXISTS idx_files_imdb ON files(imdb_id, imdb_season, imdb_episode);
            CREATE INDEX IF NOT EXISTS idx_files_kitsu ON files(kitsu_id, kitsu_episode);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Database(format!("Lock poisoned: {}", e)))
    }

    /// WHERE clause and parameters selecting the files of `content`.
    fn content_filter(content: &ContentId) -> (&'static str, Vec<Value>) {
        match (content.content_type(), content.source()) {
            (ContentType::Series, ContentSource::Imdb { id, season, episode }) => (
                "f.imdb_id = ?1 AND f.imdb_season = ?2 AND f.imdb_episode = ?3",
                vec![
                    Value::Text(id.clone()),
                    Value::Integer(season.unwrap_or(0) as i64),
                    Value::Integer(episode.unwrap_or(0) as i64),
                ],
            ),
            (_, ContentSource::Imdb { id, .. }) => {
                ("f.imdb_id = ?1", vec![Value::Text(id.clone())])
            }
            (_, ContentSource::Kitsu { id, episode: Some(episode) }) => (
                "f.kitsu_id = ?1 AND f.kitsu_episode = ?2",
                vec![Value::Integer(*id as i64), Value::Integer(*episode as i64)],
            ),
            (_, ContentSource::Kitsu { id, episode: None }) => {
                ("f.kitsu_id = ?1", vec![Value::Integer(*id as i64)])
            }
        }
    }

    fn row_to_records(row: &rusqlite::Row) -> rusqlite::Result<(TorrentRecord, FileRecord)> {
        let info_hash: String = row.get(0)?;
        let torrent = Self::row_to_torrent(row)?;
        let file = FileRecord {
            info_hash,
            file_index: row.get::<_, i64>(11)? as u32,
            title: row.get(12)?,
            size_bytes: row.get::<_, i64>(13)?.max(0) as u64,
            imdb_id: row.get(14)?,
            imdb_season: row.get::<_, Option<i64>>(15)?.map(|v| v as u32),
            imdb_episode: row.get::<_, Option<i64>>(16)?.map(|v| v as u32),
            kitsu_id: row.get::<_, Option<i64>>(17)?.map(|v| v as u64),
            kitsu_episode: row.get::<_, Option<i64>>(18)?.map(|v| v as u32),
        };
        Ok((torrent, file))
    }

    /// Convert the first eleven columns of a row to a TorrentRecord.
    fn row_to_torrent(row: &rusqlite::Row) -> rusqlite::Result<TorrentRecord> {
        let content_type: String = row.get(5)?;
        let upload_date_str: String = row.get(6)?;
        let upload_date = DateTime::parse_from_rfc3339(&upload_date_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(TorrentRecord {
            info_hash: row.get(0)?,
            provider: row.get(1)?,
            torrent_id: row.get(2)?,
            title: row.get(3)?,
            size_bytes: row.get::<_, i64>(4)?.max(0) as u64,
            content_type: content_type.parse().unwrap_or(ContentType::Movie),
            upload_date,
            seeders: row.get::<_, i64>(7)?.max(0) as u32,
            trackers: split_list(&row.get::<_, String>(8)?),
            languages: split_list(&row.get::<_, String>(9)?),
            resolution: row.get(10)?,
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

const TORRENT_COLUMNS: &str = "t.info_hash, t.provider, t.torrent_id, t.title, t.size_bytes, \
     t.content_type, t.upload_date, t.seeders, t.trackers, t.languages, t.resolution";

impl StreamStore for SqliteStreamStore {
    fn query_by_content(&self, content: &ContentId) -> Result<Vec<StreamCandidate>, StoreError> {
        let conn = self.lock()?;
        let (filter, values) = Self::content_filter(content);

        let sql = format!(
            "SELECT {TORRENT_COLUMNS},
                    f.file_index, f.title, f.size_bytes, f.imdb_id, f.imdb_season,
                    f.imdb_episode, f.kitsu_id, f.kitsu_episode
             FROM files f
             JOIN torrents t ON t.info_hash = f.info_hash
             WHERE {filter}
             ORDER BY t.seeders DESC
             LIMIT {QUERY_LIMIT}"
        );

        let mut stmt = conn.prepare(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params_from_iter(values), Self::row_to_records)
            .map_err(db_err)?;

        let mut results = Vec::new();
        for row in rows {
            let (torrent, file) = row.map_err(db_err)?;
            results.push(to_candidate(content.key(), &torrent, &file));
        }

        debug!(content_id = %content.key(), results = results.len(), "Store query complete");
        Ok(results)
    }

    fn upsert(&self, torrents: &[TorrentRecord], files: &[FileRecord]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        for torrent in torrents {
            if torrent.info_hash.trim().is_empty() {
                return Err(StoreError::InvalidRecord(format!(
                    "torrent '{}' has no info_hash",
                    torrent.title
                )));
            }
            tx.execute(
                "INSERT INTO torrents (info_hash, provider, torrent_id, title, size_bytes, content_type,
                                       upload_date, seeders, trackers, languages, resolution)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(info_hash) DO UPDATE SET
                    provider = excluded.provider,
                    torrent_id = COALESCE(excluded.torrent_id, torrent_id),
                    title = excluded.title,
                    size_bytes = excluded.size_bytes,
                    content_type = excluded.content_type,
                    upload_date = excluded.upload_date,
                    seeders = excluded.seeders,
                    trackers = excluded.trackers,
                    languages = excluded.languages,
                    resolution = COALESCE(excluded.resolution, resolution)",
                params![
                    torrent.info_hash.to_lowercase(),
                    &torrent.provider,
                    &torrent.torrent_id,
                    &torrent.title,
                    torrent.size_bytes as i64,
                    torrent.content_type.as_str(),
                    torrent.upload_date.to_rfc3339(),
                    torrent.seeders as i64,
                    torrent.trackers.join(","),
                    torrent.languages.join(","),
                    &torrent.resolution,
                ],
            )
            .map_err(db_err)?;
        }

        for file in files {
            tx.execute(
                "INSERT INTO files (info_hash, file_index, title, size_bytes, imdb_id, imdb_season,
                                    imdb_episode, kitsu_id, kitsu_episode)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(info_hash, file_index) DO UPDATE SET
                    title = excluded.title,
                    size_bytes = excluded.size_bytes,
                    imdb_id = excluded.imdb_id,
                    imdb_season = excluded.imdb_season,
                    imdb_episode = excluded.imdb_episode,
                    kitsu_id = excluded.kitsu_id,
                    kitsu_episode = excluded.kitsu_episode",
                params![
                    file.info_hash.to_lowercase(),
                    file.file_index as i64,
                    &file.title,
                    file.size_bytes as i64,
                    &file.imdb_id,
                    file.imdb_season.map(|v| v as i64),
                    file.imdb_episode.map(|v| v as i64),
                    file.kitsu_id.map(|v| v as i64),
                    file.kitsu_episode.map(|v| v as i64),
                ],
            )
            .map_err(db_err)?;
        }

        tx.commit().map_err(db_err)?;
        debug!(
            torrents = torrents.len(),
            files = files.len(),
            "Stored torrents and files"
        );
        Ok(())
    }

    fn get_torrent(&self, info_hash: &str) -> Result<Option<TorrentRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {TORRENT_COLUMNS} FROM torrents t WHERE t.info_hash = ?1"),
            params![info_hash.to_lowercase()],
            Self::row_to_torrent,
        )
        .optional()
        .map_err(db_err)
    }
}
