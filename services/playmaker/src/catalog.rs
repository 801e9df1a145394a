//!
//! src/catalog.rs  Oct 2nd, 2026
//!
//! Spotify backed catalog: track search, batched detail lookup and
//! playlist writes. Raw payloads are normalized into ResolvedTrack here
//!

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::{sync::Mutex, time::Instant};
use tracing::debug;

use crate::config::RetryConfig;
use crate::errors::ProviderError;
use crate::fetch::{http_with_retry, SpotifyClient};
use crate::provider::{CatalogResolver, CreatedPlaylist, PlaylistWriter};
use crate::types::{CatalogId, ResolvedTrack};

/// Max ids accepted by GET /v1/tracks
pub const LOOKUP_CHUNK: usize = 50;
/// Max uris accepted by POST /v1/playlists/{id}/tracks
pub const ADD_TRACKS_CHUNK: usize = 100;

/// Comma separated id lists, one per GET /v1/tracks call
pub fn lookup_batches(ids: &[CatalogId]) -> Vec<String> {
    ids.chunks(LOOKUP_CHUNK)
        .map(|chunk| chunk.iter().map(CatalogId::as_str).collect::<Vec<_>>().join(","))
        .collect()
}

/// Track uris, one list per add call
pub fn add_batches(ids: &[CatalogId]) -> Vec<Vec<String>> {
    ids.chunks(ADD_TRACKS_CHUNK)
        .map(|chunk| chunk.iter().map(|id| format!("spotify:track:{id}")).collect())
        .collect()
}

/// Tracks of a batch lookup response; unknown ids come back as nulls
pub fn tracks_from_lookup(value: &Value) -> Vec<ResolvedTrack> {
    value.get("tracks")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(track_from_json).collect())
        .unwrap_or_default()
}

/// Normalizes one Spotify track object, None for nulls or missing ids
pub fn track_from_json(track: &Value) -> Option<ResolvedTrack> {
    let id = track.get("id").and_then(|v| v.as_str())?;
    if id.is_empty() {
        return None;
    }

    let artist = track.get("artists").and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
               .filter_map(|a| a.get("name").and_then(|v| v.as_str()))
               .collect::<Vec<_>>()
               .join(", ")
        })
        .unwrap_or_default();

    Some(ResolvedTrack {
        catalog_id: CatalogId(id.to_string()),
        title: track.get("name").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        artist,
        album: track.pointer("/album/name").and_then(|v| v.as_str()).map(str::to_string),
        artwork_ref: track.pointer("/album/images/0/url")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        preview_ref: track.get("preview_url").and_then(|v| v.as_str()).map(str::to_string)
    })
}

#[derive(Debug)]
struct Bearer {
    token: String,
    expires: Option<Instant>
}

pub struct SpotifyCatalog {
    client: SpotifyClient,
    retry: RetryConfig,
    bearer: Mutex<Option<Bearer>>
}

impl SpotifyCatalog {
    pub fn new(client: SpotifyClient, retry: RetryConfig) -> Self {
        // a configured user token never expires from our point of view
        let bearer = client.cfg.access_token.clone()
            .map(|token| Bearer { token, expires: None });
        Self { client, retry, bearer: Mutex::new(bearer) }
    }

    async fn refresh_token(&self) -> Result<Bearer, ProviderError> {
        let response = http_with_retry(self.client.token_request()?, &self.retry).await?;
        let token = response["access_token"].as_str()
            .ok_or_else(|| ProviderError::Parse("no access_token in response".into()))?
            .to_string();
        let expires_in = response["expires_in"].as_u64().unwrap_or(3600);
        let expires = Instant::now() + Duration::from_secs(expires_in.saturating_sub(60));
        debug!(expires_in, "spotify.token.refreshed");
        Ok(Bearer { token, expires: Some(expires) })
    }

    async fn bearer(&self) -> Result<String, ProviderError> {
        let mut guard = self.bearer.lock().await;
        let fresh = match guard.as_ref() {
            Some(b) => b.expires.is_none_or(|at| Instant::now() < at),
            None => false
        };
        if !fresh {
            *guard = Some(self.refresh_token().await?);
        }
        guard.as_ref()
            .map(|b| b.token.clone())
            .ok_or_else(|| ProviderError::Auth("no bearer token".into()))
    }
}

#[async_trait]
impl CatalogResolver for SpotifyCatalog {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ResolvedTrack>, ProviderError> {
        let bearer = self.bearer().await?;
        let value = http_with_retry(
            self.client.search(query, limit.clamp(1, 50), &bearer)?,
            &self.retry
        ).await?;

        let items = value.pointer("/tracks/items")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ProviderError::Parse("search response has no tracks.items".into()))?;
        Ok(items.iter().filter_map(track_from_json).collect())
    }

    async fn lookup_many(&self, ids: &[CatalogId]) -> Result<Vec<ResolvedTrack>, ProviderError> {
        let bearer = self.bearer().await?;
        let mut out = Vec::with_capacity(ids.len());
        for csv in lookup_batches(ids) {
            let value = http_with_retry(
                self.client.batch_track(&csv, &bearer)?,
                &self.retry
            ).await?;
            out.extend(tracks_from_lookup(&value));
        }
        Ok(out)
    }
}

#[async_trait]
impl PlaylistWriter for SpotifyCatalog {
    async fn current_user(&self) -> Result<String, ProviderError> {
        let bearer = self.bearer().await?;
        let profile = http_with_retry(self.client.me(&bearer)?, &self.retry).await?;
        profile["id"].as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Parse("profile has no id".into()))
    }

    async fn create_playlist(
        &self,
        name: &str,
        description: &str
    ) -> Result<CreatedPlaylist, ProviderError> {
        let bearer = self.bearer().await?;
        let value = http_with_retry(
            self.client.create_playlist(name, description, &bearer)?,
            &self.retry
        ).await?;
        let id = value["id"].as_str()
            .ok_or_else(|| ProviderError::Parse("created playlist has no id".into()))?
            .to_string();
        let url = value.pointer("/external_urls/spotify").and_then(|v| v.as_str()).map(str::to_string);
        Ok(CreatedPlaylist { id, url })
    }

    async fn add_tracks(&self, playlist_id: &str, ids: &[CatalogId]) -> Result<(), ProviderError> {
        let bearer = self.bearer().await?;
        for uris in add_batches(ids) {
            http_with_retry(
                self.client.add_tracks(playlist_id, &uris, &bearer)?,
                &self.retry
            ).await?;
        }
        Ok(())
    }
}
