//!
//! src/testing.rs  Oct 2nd, 2026
//!
//! In-crate fakes of the provider traits used by unit tests
//!

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::provider::{CatalogResolver, CreatedPlaylist, PlaylistWriter, SuggestionSource};
use crate::types::{CandidateDescriptor, CatalogId, ResolvedTrack};

pub fn track(id: &str, title: &str) -> ResolvedTrack {
    ResolvedTrack {
        catalog_id: id.into(),
        title: title.to_string(),
        artist: format!("{title} artist"),
        album: None,
        artwork_ref: None,
        preview_ref: None
    }
}

pub fn track_on_album(id: &str, title: &str, album: &str) -> ResolvedTrack {
    ResolvedTrack { album: Some(album.to_string()), ..track(id, title) }
}

/// `n` descriptors "Song {i}" by "Artist {i}" starting at `from`
pub fn descriptors(from: usize, n: usize) -> Vec<CandidateDescriptor> {
    (from..from + n)
        .map(|i| CandidateDescriptor::new(format!("Song {i}"), format!("Artist {i}")))
        .collect()
}

/// Fake catalog where "Song {i} Artist {i}" resolves to id "id-{i}"
pub fn catalog_for(from: usize, n: usize) -> FakeCatalog {
    let mut catalog = FakeCatalog::new();
    for i in from..from + n {
        catalog = catalog.with_search(
            &format!("Song {i} Artist {i}"),
            vec![track(&format!("id-{i}"), &format!("Song {i}"))]
        );
    }
    catalog
}

fn norm(query: &str) -> String {
    query.trim().to_lowercase()
}

#[derive(Default)]
pub struct FakeCatalog {
    results: HashMap<String, Vec<ResolvedTrack>>,
    failures: HashMap<String, ProviderError>,
    fail_all: Option<ProviderError>,
    queries: Mutex<Vec<String>>,
    searches: AtomicUsize
}

impl FakeCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn with_search(mut self, query: &str, tracks: Vec<ResolvedTrack>) -> Self {
        self.results.entry(norm(query)).or_default().extend(tracks);
        self
    }

    pub fn fail_query(mut self, query: &str, err: ProviderError) -> Self {
        self.failures.insert(norm(query), err);
        self
    }

    pub fn failing(mut self, err: ProviderError) -> Self {
        self.fail_all = Some(err);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogResolver for FakeCatalog {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<ResolvedTrack>, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(err) = &self.fail_all {
            return Err(err.clone());
        }
        let key = norm(query);
        if let Some(err) = self.failures.get(&key) {
            return Err(err.clone());
        }
        Ok(self.results.get(&key)
            .map(|t| t.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn lookup_many(&self, ids: &[CatalogId]) -> Result<Vec<ResolvedTrack>, ProviderError> {
        if let Some(err) = &self.fail_all {
            return Err(err.clone());
        }
        Ok(ids.iter()
            .filter_map(|id| {
                self.results.values()
                    .flatten()
                    .find(|t| &t.catalog_id == id)
                    .cloned()
            })
            .collect())
    }
}

/// Scripted suggestion provider, one queued response per suggest call
#[derive(Default)]
pub struct FakeSuggestions {
    responses: Mutex<VecDeque<Result<Vec<CandidateDescriptor>, ProviderError>>>,
    title: Option<String>,
    requests: Mutex<Vec<(usize, usize)>>
}

impl FakeSuggestions {
    pub fn new() -> Self { Self::default() }

    pub fn then(self, response: Result<Vec<CandidateDescriptor>, ProviderError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// (count, exclusions) per suggest call
    pub fn requests(&self) -> Vec<(usize, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SuggestionSource for FakeSuggestions {
    async fn suggest(
        &self,
        _query: &str,
        count: usize,
        exclude: &[(String, String)]
    ) -> Result<Vec<CandidateDescriptor>, ProviderError> {
        self.requests.lock().unwrap().push((count, exclude.len()));
        self.responses.lock().unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn title(&self, _query: &str) -> String {
        self.title.clone().unwrap_or_else(|| crate::config::FALLBACK_TITLE.to_string())
    }
}

#[derive(Default)]
pub struct FakeWriter {
    pub fail_create: bool,
    pub created: Mutex<Vec<(String, String)>>,
    pub added: Mutex<Vec<CatalogId>>
}

#[async_trait]
impl PlaylistWriter for FakeWriter {
    async fn current_user(&self) -> Result<String, ProviderError> {
        Ok("listener".to_string())
    }

    async fn create_playlist(
        &self,
        name: &str,
        description: &str
    ) -> Result<CreatedPlaylist, ProviderError> {
        if self.fail_create {
            return Err(ProviderError::Auth("token expired".into()));
        }
        self.created.lock().unwrap().push((name.to_string(), description.to_string()));
        Ok(CreatedPlaylist {
            id: "pl-1".to_string(),
            url: Some("https://open.spotify.com/playlist/pl-1".to_string())
        })
    }

    async fn add_tracks(&self, _playlist_id: &str, ids: &[CatalogId]) -> Result<(), ProviderError> {
        self.added.lock().unwrap().extend_from_slice(ids);
        Ok(())
    }
}
