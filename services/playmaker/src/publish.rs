//!
//! src/publish.rs  Oct 2nd, 2026
//!
//! Materializes a generated playlist in the user's account and records
//! it in the history store
//!

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{PipelineError, ProviderError, Stage};
use crate::persistent::{HistoryEntry, Persistent};
use crate::provider::{CatalogResolver, CreatedPlaylist, PlaylistWriter};
use crate::types::CatalogId;

pub const DEFAULT_DESCRIPTION: &str = "Generated by PlayMaker";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedPlaylist {
    pub playlist_id: String,
    pub playlist_url: Option<String>,
    pub owner: String,
    pub track_count: usize,
    pub playlist_hash: Option<String>
}

pub struct PlaylistPublisher {
    writer: Arc<dyn PlaylistWriter>,
    catalog: Arc<dyn CatalogResolver>,
    history: Option<Arc<Persistent>>
}

impl PlaylistPublisher {
    pub fn new(
        writer: Arc<dyn PlaylistWriter>,
        catalog: Arc<dyn CatalogResolver>,
        history: Option<Arc<Persistent>>
    ) -> Self {
        Self { writer, catalog, history }
    }

    pub async fn publish(
        &self,
        name: &str,
        description: Option<&str>,
        track_ids: &[CatalogId]
    ) -> Result<PublishedPlaylist, PipelineError> {
        let fail = |e: ProviderError| PipelineError::new(Stage::Publish, e);

        let owner = self.writer.current_user().await.map_err(fail)?;
        let text = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(DEFAULT_DESCRIPTION);
        let created = self.writer.create_playlist(name, text).await.map_err(fail)?;
        self.writer.add_tracks(&created.id, track_ids).await.map_err(fail)?;
        info!(owner, playlist = %created.id, tracks = track_ids.len(), "publish.created");

        let playlist_hash = self.record(&owner, name, description, &created, track_ids).await;

        Ok(PublishedPlaylist {
            playlist_id: created.id,
            playlist_url: created.url,
            owner,
            track_count: track_ids.len(),
            playlist_hash
        })
    }

    /// History is best effort, a failure here never undoes the publish
    async fn record(
        &self,
        owner: &str,
        name: &str,
        description: Option<&str>,
        created: &CreatedPlaylist,
        track_ids: &[CatalogId]
    ) -> Option<String> {
        let history = self.history.as_ref()?;

        let tracks = match self.catalog.lookup_many(track_ids).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(error = %e, "publish.history.lookup_failed");
                return None;
            }
        };

        match history.create_playlist_history(owner, name, description, created, &tracks).await {
            Ok(saved) => Some(saved.playlist_hash),
            Err(e) => {
                warn!(error = %e, "publish.history.failed");
                None
            }
        }
    }
}

/// Fills each entry's album art from its first tracks. Best effort, a
/// failed lookup leaves that entry without artwork
pub async fn attach_album_art(catalog: &dyn CatalogResolver, entries: &mut [HistoryEntry]) {
    for entry in entries.iter_mut() {
        let ids = entry.preview_ids();
        if ids.is_empty() {
            continue;
        }
        match catalog.lookup_many(&ids).await {
            Ok(tracks) => {
                entry.album_art = tracks.into_iter().filter_map(|t| t.artwork_ref).collect();
            }
            Err(e) => warn!(playlist = %entry.playlist.playlist_hash, error = %e, "history.album_art.failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{track, FakeCatalog, FakeWriter};

    fn ids(raw: &[&str]) -> Vec<CatalogId> {
        raw.iter().map(|s| CatalogId::from(*s)).collect()
    }

    #[tokio::test]
    async fn publishes_and_records_history() {
        let writer = Arc::new(FakeWriter::default());
        let catalog = Arc::new(
            FakeCatalog::new().with_search("x", vec![track("a", "A"), track("b", "B")])
        );
        let db = Arc::new(Persistent::init("sqlite::memory:").await.unwrap());
        let publisher = PlaylistPublisher::new(writer.clone(), catalog, Some(db.clone()));

        let out = publisher.publish("Eighties", None, &ids(&["a", "b"])).await.unwrap();
        assert_eq!(out.playlist_id, "pl-1");
        assert_eq!(out.owner, "listener");
        assert_eq!(writer.created.lock().unwrap()[0].1, DEFAULT_DESCRIPTION);
        assert_eq!(*writer.added.lock().unwrap(), ids(&["a", "b"]));

        let hash = out.playlist_hash.unwrap();
        let saved = db.get_playlist_details(&hash).await.unwrap().unwrap();
        assert_eq!(saved.track_count, 2);
        assert_eq!(db.get_playlist_tracks(saved.id).await.unwrap()[1].catalog_id, "b");
    }

    #[tokio::test]
    async fn history_failure_does_not_fail_publish() {
        let writer = Arc::new(FakeWriter::default());
        let catalog = Arc::new(FakeCatalog::new().failing(ProviderError::Http("down".into())));
        let db = Arc::new(Persistent::init("sqlite::memory:").await.unwrap());
        let publisher = PlaylistPublisher::new(writer, catalog, Some(db));

        let out = publisher.publish("Eighties", Some("mine"), &ids(&["a"])).await.unwrap();
        assert!(out.playlist_hash.is_none());
    }

    #[tokio::test]
    async fn album_art_comes_from_first_four_tracks() {
        let with_art = |i: usize| crate::types::ResolvedTrack {
            artwork_ref: Some(format!("https://img/{i}")),
            ..track(&format!("t{i}"), &format!("Song {i}"))
        };
        let tracks: Vec<_> = (0..6).map(with_art).collect();
        let catalog = FakeCatalog::new().with_search("all", tracks.clone());
        let db = Persistent::init("sqlite::memory:").await.unwrap();
        let created = CreatedPlaylist { id: "pl-1".into(), url: None };
        db.create_playlist_history("listener", "Six", None, &created, &tracks).await.unwrap();
        db.create_playlist_history("listener", "Empty", None, &created, &[]).await.unwrap();

        let mut entries = db.get_user_playlists_with_tracks("listener", 10, 0).await.unwrap();
        attach_album_art(&catalog, &mut entries).await;
        assert!(entries[0].album_art.is_empty());
        assert_eq!(entries[1].album_art, vec![
            "https://img/0", "https://img/1", "https://img/2", "https://img/3"
        ]);

        let down = FakeCatalog::new().failing(ProviderError::Http("down".into()));
        let mut entries = db.get_user_playlists_with_tracks("listener", 10, 0).await.unwrap();
        attach_album_art(&down, &mut entries).await;
        assert!(entries.iter().all(|e| e.album_art.is_empty()));
    }

    #[tokio::test]
    async fn create_failure_is_a_publish_error() {
        let writer = Arc::new(FakeWriter { fail_create: true, ..FakeWriter::default() });
        let publisher = PlaylistPublisher::new(writer, Arc::new(FakeCatalog::new()), None);

        let err = publisher.publish("x", None, &ids(&["a"])).await.unwrap_err();
        assert_eq!(err.stage, Stage::Publish);
        assert!(matches!(err.source, ProviderError::Auth(_)));
    }
}
