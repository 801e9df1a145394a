//!
//! src/persistent.rs  Oct 2nd, 2026
//!
//! Append-only history of published playlists. One row per playlist in
//! playlist_history, its ordered tracks in playlist_tracks
//!

use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use sqlx::sqlite::SqliteRow;

use crate::errors::PlaymakerError;
use crate::provider::CreatedPlaylist;
use crate::types::{CatalogId, ResolvedTrack};

const HASH_LEN: usize = 32;
/// Tracks whose artwork previews a history entry
pub const ALBUM_ART_PREVIEW: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistHistory {
    pub id: i64,
    pub playlist_hash: String,
    pub owner: String,
    pub playlist_name: String,
    pub user_description: Option<String>,
    pub external_playlist_id: String,
    pub external_playlist_url: Option<String>,
    pub created_at: String,
    pub track_count: i64
}

impl PlaylistHistory {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            playlist_hash: row.get("playlist_hash"),
            owner: row.get("owner"),
            playlist_name: row.get("playlist_name"),
            user_description: row.get("user_description"),
            external_playlist_id: row.get("external_playlist_id"),
            external_playlist_url: row.get("external_playlist_url"),
            created_at: row.get("created_at"),
            track_count: row.get("track_count")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryTrack {
    pub position: i64,
    pub catalog_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>
}

/// A history row with its ordered tracks, as listed back to the user.
/// `album_art` is filled from the catalog when one is reachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub playlist: PlaylistHistory,
    pub tracks: Vec<HistoryTrack>,
    pub album_art: Vec<String>
}

impl HistoryEntry {
    pub fn preview_ids(&self) -> Vec<CatalogId> {
        self.tracks.iter()
            .take(ALBUM_ART_PREVIEW)
            .map(|t| CatalogId(t.catalog_id.clone()))
            .collect()
    }
}

/// Content derived key: sha256 over name and creation time, hex, truncated
pub fn playlist_hash(name: &str, created_at: &str) -> String {
    let digest = Sha256::digest(format!("{name}{created_at}").as_bytes());
    let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(HASH_LEN);
    hex
}

pub struct Persistent {
    pool: Pool<Sqlite>
}

impl Persistent {

    async fn ensure_schema(pool: &Pool<Sqlite>) -> Result<(), PlaymakerError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS playlist_history (
              id                    INTEGER PRIMARY KEY AUTOINCREMENT,
              playlist_hash         TEXT NOT NULL UNIQUE,
              owner                 TEXT NOT NULL,
              playlist_name         TEXT NOT NULL,
              user_description      TEXT,
              external_playlist_id  TEXT NOT NULL,
              external_playlist_url TEXT,
              created_at            TEXT NOT NULL,
              track_count           INTEGER NOT NULL
            );
            "
        ).execute(pool).await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS playlist_tracks (
              id          INTEGER PRIMARY KEY AUTOINCREMENT,
              history_id  INTEGER NOT NULL REFERENCES playlist_history(id),
              position    INTEGER NOT NULL,
              catalog_id  TEXT NOT NULL,
              track_name  TEXT NOT NULL,
              artist_name TEXT NOT NULL,
              album_name  TEXT,
              UNIQUE (history_id, position)
            );
            "
        ).execute(pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_owner ON playlist_history(owner, created_at);"
        ).execute(pool).await?;

        Ok(())
    }

    pub async fn init(database_url: &str) -> Result<Self, PlaymakerError> {
        let is_memory = database_url == "sqlite::memory:";
        if !is_memory {
            Self::ensure_parent_dir(database_url)?;
        }

        let mut opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // WAL is file only
        if !is_memory {
            opts = opts.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                       .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(if is_memory {1} else {4})
            .connect_with(opts)
            .await?;

        Self::ensure_schema(&pool).await?;

        Ok(Self { pool })
    }

    fn ensure_parent_dir(database_url: &str) -> Result<(), PlaymakerError> {
        let path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Records a published playlist and its tracks in one transaction
    pub async fn create_playlist_history(
        &self,
        owner: &str,
        name: &str,
        description: Option<&str>,
        external: &CreatedPlaylist,
        tracks: &[ResolvedTrack]
    ) -> Result<PlaylistHistory, PlaymakerError> {
        let created_at = Self::now();
        let hash = playlist_hash(name, &created_at);

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO playlist_history (
                playlist_hash, owner, playlist_name, user_description,
                external_playlist_id, external_playlist_url, created_at, track_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id;
            "
        )
        .bind(&hash)
        .bind(owner)
        .bind(name)
        .bind(description)
        .bind(&external.id)
        .bind(external.url.as_deref())
        .bind(&created_at)
        .bind(tracks.len() as i64)
        .fetch_one(&mut *tx)
        .await?;

        // positions are 1 based
        for (position, t) in (1_i64..).zip(tracks) {
            sqlx::query(
                r"
                INSERT INTO playlist_tracks (
                    history_id, position, catalog_id, track_name, artist_name, album_name
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);
                "
            )
            .bind(id)
            .bind(position)
            .bind(t.catalog_id.as_str())
            .bind(&t.title)
            .bind(&t.artist)
            .bind(t.album.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(PlaylistHistory {
            id,
            playlist_hash: hash,
            owner: owner.to_string(),
            playlist_name: name.to_string(),
            user_description: description.map(str::to_string),
            external_playlist_id: external.id.clone(),
            external_playlist_url: external.url.clone(),
            created_at,
            track_count: tracks.len() as i64
        })
    }

    /// Newest first
    pub async fn get_user_playlists(&self, owner: &str, limit: i64, offset: i64) ->
        Result<Vec<PlaylistHistory>, PlaymakerError> {
        let rows = sqlx::query(
            r"
            SELECT * FROM playlist_history
             WHERE owner = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3;
            "
        )
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(PlaylistHistory::from_row).collect())
    }

    /// Newest first, each with its tracks attached
    pub async fn get_user_playlists_with_tracks(&self, owner: &str, limit: i64, offset: i64) ->
        Result<Vec<HistoryEntry>, PlaymakerError> {
        let mut entries = Vec::new();
        for playlist in self.get_user_playlists(owner, limit, offset).await? {
            let tracks = self.get_playlist_tracks(playlist.id).await?;
            entries.push(HistoryEntry { playlist, tracks, album_art: Vec::new() });
        }
        Ok(entries)
    }

    pub async fn get_playlist_entry(&self, hash: &str) ->
        Result<Option<HistoryEntry>, PlaymakerError> {
        let Some(playlist) = self.get_playlist_details(hash).await? else {
            return Ok(None);
        };
        let tracks = self.get_playlist_tracks(playlist.id).await?;
        Ok(Some(HistoryEntry { playlist, tracks, album_art: Vec::new() }))
    }

    pub async fn get_playlist_details(&self, hash: &str) ->
        Result<Option<PlaylistHistory>, PlaymakerError> {
        let row = sqlx::query("SELECT * FROM playlist_history WHERE playlist_hash = ?1;")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(PlaylistHistory::from_row))
    }

    pub async fn get_playlist_tracks(&self, history_id: i64) ->
        Result<Vec<HistoryTrack>, PlaymakerError> {
        let rows = sqlx::query(
            r"
            SELECT position, catalog_id, track_name, artist_name, album_name
              FROM playlist_tracks
             WHERE history_id = ?1
             ORDER BY position;
            "
        )
        .bind(history_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| HistoryTrack {
            position: r.get("position"),
            catalog_id: r.get("catalog_id"),
            track_name: r.get("track_name"),
            artist_name: r.get("artist_name"),
            album_name: r.get("album_name")
        }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{track, track_on_album};

    fn external(id: &str) -> CreatedPlaylist {
        CreatedPlaylist { id: id.to_string(), url: Some(format!("https://open.spotify.com/playlist/{id}")) }
    }

    #[test]
    fn hash_is_stable_and_truncated() {
        let a = playlist_hash("Morning Energy Boost", "2026-10-02T10:00:00.000000Z");
        assert_eq!(a.len(), HASH_LEN);
        assert_eq!(a, playlist_hash("Morning Energy Boost", "2026-10-02T10:00:00.000000Z"));
        assert_ne!(a, playlist_hash("Morning Energy Boost", "2026-10-02T10:00:00.000001Z"));
    }

    #[tokio::test]
    async fn history_round_trips_with_ordered_tracks() {
        let db = Persistent::init("sqlite::memory:").await.unwrap();
        let tracks = vec![
            track_on_album("t1", "Africa", "Toto IV"),
            track("t2", "Take On Me")
        ];
        let saved = db.create_playlist_history(
            "listener", "Eighties", Some("road trip"), &external("pl-1"), &tracks
        ).await.unwrap();
        assert_eq!(saved.track_count, 2);

        let found = db.get_playlist_details(&saved.playlist_hash).await.unwrap().unwrap();
        assert_eq!(found, saved);

        let rows = db.get_playlist_tracks(saved.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].catalog_id, "t1");
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[0].album_name.as_deref(), Some("Toto IV"));
        assert_eq!(rows[1].position, 2);
        assert_eq!(rows[1].album_name, None);

        assert!(db.get_playlist_details("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn user_playlists_are_newest_first_and_paged() {
        let db = Persistent::init("sqlite::memory:").await.unwrap();
        for i in 0..3 {
            db.create_playlist_history(
                "listener", &format!("List {i}"), None, &external(&format!("pl-{i}")), &[]
            ).await.unwrap();
        }
        db.create_playlist_history("someone", "Other", None, &external("pl-x"), &[])
            .await.unwrap();

        let page = db.get_user_playlists("listener", 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].playlist_name, "List 2");
        assert_eq!(page[1].playlist_name, "List 1");

        let rest = db.get_user_playlists("listener", 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].playlist_name, "List 0");
    }

    #[tokio::test]
    async fn listed_playlists_carry_their_tracks() {
        let db = Persistent::init("sqlite::memory:").await.unwrap();
        let tracks: Vec<_> = (0..6).map(|i| track(&format!("t{i}"), &format!("Song {i}"))).collect();
        let saved = db.create_playlist_history(
            "listener", "Six", None, &external("pl-6"), &tracks
        ).await.unwrap();

        let entries = db.get_user_playlists_with_tracks("listener", 10, 0).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tracks.len(), 6);
        assert_eq!(entries[0].tracks[5].position, 6);
        assert_eq!(entries[0].preview_ids().len(), ALBUM_ART_PREVIEW);
        assert!(entries[0].album_art.is_empty());

        let v = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(v["playlist_name"], "Six");
        assert_eq!(v["tracks"][0]["catalog_id"], "t0");

        let one = db.get_playlist_entry(&saved.playlist_hash).await.unwrap().unwrap();
        assert_eq!(one, entries[0]);
        assert!(db.get_playlist_entry("missing").await.unwrap().is_none());
    }
}
