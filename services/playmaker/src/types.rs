//!
//! src/types.rs  Oct 2nd, 2026
//!
//! Canonical track records shared by every stage of the pipeline.
//! Provider payloads are normalized into these at the boundary
//!

use std::collections::HashSet;
use std::fmt;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_YEAR: &str = "Unknown";

pub const GROUP_SIZE: usize = 5;
pub const MAX_ALTERNATES: usize = GROUP_SIZE - 1;
pub const MAX_GROUPS: usize = 10;

// Stable catalog identifier, the dedup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(pub String);

impl CatalogId {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CatalogId {
    fn from(s: &str) -> Self { CatalogId(s.to_string()) }
}

/// A provider suggested track, not yet matched against the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateDescriptor {
    pub track_name: String,
    pub artist: String,
    pub album: String,
    pub release_year: String
}

impl CandidateDescriptor {
    pub fn new(track_name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist: artist.into(),
            album: UNKNOWN_ALBUM.to_string(),
            release_year: UNKNOWN_YEAR.to_string()
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        let album = album.into();
        if !album.trim().is_empty() {
            self.album = album;
        }
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        let year = year.into();
        if !year.trim().is_empty() {
            self.release_year = year;
        }
        self
    }

    pub fn has_known_album(&self) -> bool {
        let album = self.album.trim();
        !album.is_empty() && album != UNKNOWN_ALBUM
    }
}

/// Raw descriptor as emitted by a suggestion provider. Field names drift
/// between prompts ("title" vs "track_name"), aliases absorb that
#[derive(Debug, Clone, Deserialize)]
pub struct RawDescriptor {
    #[serde(alias = "title", alias = "name", alias = "song")]
    pub track_name: Option<String>,
    #[serde(alias = "artist_name")]
    pub artist: Option<String>,
    #[serde(alias = "album_name")]
    pub album: Option<String>,
    #[serde(alias = "year")]
    pub release_year: Option<serde_json::Value>
}

impl RawDescriptor {
    /// None when name or artist is missing
    pub fn normalize(self) -> Option<CandidateDescriptor> {
        let track_name = self.track_name?.trim().to_string();
        let artist = self.artist?.trim().to_string();
        if track_name.is_empty() || artist.is_empty() {
            return None;
        }

        let year = match self.release_year {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new()
        };

        Some(
            CandidateDescriptor::new(track_name, artist)
                .with_album(self.album.unwrap_or_default())
                .with_year(year)
        )
    }
}

/// A catalog entry a descriptor resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub catalog_id: CatalogId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub artwork_ref: Option<String>,
    pub preview_ref: Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackGroup {
    pub primary: ResolvedTrack,
    pub alternates: Vec<ResolvedTrack>
}

impl TrackGroup {
    pub fn catalog_ids(&self) -> impl Iterator<Item = &CatalogId> {
        std::iter::once(&self.primary.catalog_id)
            .chain(self.alternates.iter().map(|t| &t.catalog_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistResult {
    pub name: String,
    pub groups: Vec<TrackGroup>
}

impl PlaylistResult {
    /// Primary track ids in group order, what gets published by default
    pub fn primary_ids(&self) -> Vec<CatalogId> {
        self.groups.iter().map(|g| g.primary.catalog_id.clone()).collect()
    }

    pub fn track_count(&self) -> usize {
        self.groups.iter().map(|g| 1 + g.alternates.len()).sum()
    }
}

/// Working set of resolved tracks for one pipeline run
#[derive(Debug, Clone, Default)]
pub struct Pool {
    tracks: Vec<ResolvedTrack>,
    seen: HashSet<CatalogId>
}

impl Pool {
    pub fn new() -> Self { Self::default() }

    /// Appends unless the catalog id is already present, first seen wins
    pub fn push(&mut self, track: ResolvedTrack) -> bool {
        if self.seen.contains(&track.catalog_id) {
            return false;
        }
        self.seen.insert(track.catalog_id.clone());
        self.tracks.push(track);
        true
    }

    pub fn contains(&self, id: &CatalogId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize { self.tracks.len() }

    pub fn is_empty(&self) -> bool { self.tracks.is_empty() }

    pub fn tracks(&self) -> &[ResolvedTrack] { &self.tracks }

    /// (title, artist) pairs handed to the suggestion provider so it can
    /// avoid repeating itself
    pub fn exclusions(&self) -> Vec<(String, String)> {
        self.tracks.iter()
            .map(|t| (t.title.clone(), t.artist.clone()))
            .collect()
    }
}

impl FromIterator<ResolvedTrack> for Pool {
    fn from_iter<I: IntoIterator<Item = ResolvedTrack>>(iter: I) -> Self {
        let mut pool = Pool::new();
        for track in iter {
            pool.push(track);
        }
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, title: &str) -> ResolvedTrack {
        ResolvedTrack {
            catalog_id: id.into(),
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: None,
            artwork_ref: None,
            preview_ref: None
        }
    }

    #[test]
    fn pool_keeps_first_seen() {
        let mut pool = Pool::new();
        assert!(pool.push(track("a", "first")));
        assert!(!pool.push(track("a", "second")));
        assert!(pool.push(track("b", "other")));

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.tracks()[0].title, "first");
        assert!(pool.contains(&"b".into()));
    }

    #[test]
    fn raw_descriptor_accepts_title_alias() {
        let raw: RawDescriptor = serde_json::from_str(
            r#"{"title": "Africa", "artist": "Toto", "year": 1982}"#
        ).unwrap();
        let d = raw.normalize().unwrap();
        assert_eq!(d.track_name, "Africa");
        assert_eq!(d.album, UNKNOWN_ALBUM);
        assert_eq!(d.release_year, "1982");
        assert!(!d.has_known_album());
    }

    #[test]
    fn raw_descriptor_without_artist_is_dropped() {
        let raw: RawDescriptor = serde_json::from_str(
            r#"{"track_name": "Africa", "artist": "  "}"#
        ).unwrap();
        assert!(raw.normalize().is_none());
    }
}
