//!
//! src/provider.rs  Oct 2nd, 2026
//!
//! Seams to the external collaborators. The pipeline only ever talks
//! to these traits, concrete clients live in suggest.rs and catalog.rs
//!

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::types::{CandidateDescriptor, CatalogId, ResolvedTrack};

/// Text generation provider producing candidate tracks for a query
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    /// Up to `count` descriptors. `exclude` holds (title, artist) pairs
    /// already in hand; honoring it is best effort
    async fn suggest(
        &self,
        query: &str,
        count: usize,
        exclude: &[(String, String)]
    ) -> Result<Vec<CandidateDescriptor>, ProviderError>;

    /// Playlist title for the query. Never fails, falls back to a
    /// fixed literal
    async fn title(&self, query: &str) -> String;
}

/// Streaming catalog search and detail lookup
#[async_trait]
pub trait CatalogResolver: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ResolvedTrack>, ProviderError>;

    async fn lookup_many(&self, ids: &[CatalogId]) -> Result<Vec<ResolvedTrack>, ProviderError>;
}

/// Lets one shared client sit behind decorators while also being used
/// directly, e.g. as the playlist writer
#[async_trait]
impl<T: CatalogResolver + ?Sized> CatalogResolver for Arc<T> {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ResolvedTrack>, ProviderError> {
        (**self).search(query, limit).await
    }

    async fn lookup_many(&self, ids: &[CatalogId]) -> Result<Vec<ResolvedTrack>, ProviderError> {
        (**self).lookup_many(ids).await
    }
}

/// Created playlist as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPlaylist {
    pub id: String,
    pub url: Option<String>
}

/// Write access to the user's account on the streaming platform
#[async_trait]
pub trait PlaylistWriter: Send + Sync {
    /// Platform username of the token holder
    async fn current_user(&self) -> Result<String, ProviderError>;

    async fn create_playlist(
        &self,
        name: &str,
        description: &str
    ) -> Result<CreatedPlaylist, ProviderError>;

    async fn add_tracks(&self, playlist_id: &str, ids: &[CatalogId]) -> Result<(), ProviderError>;
}
