//!
//! src/events.rs  Oct 2nd, 2026
//!
//! Progress events of a streaming pipeline run and the wire shape of
//! a generated playlist
//!

use serde::Serialize;
use tokio::sync::mpsc;

use crate::types::{PlaylistResult, ResolvedTrack, TrackGroup};

/// Track as the client renders it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackView {
    pub title: String,
    pub artist: String,
    pub spotify_id: String,
    pub album: Option<String>,
    pub album_art: Option<String>,
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<TrackView>>
}

impl From<&ResolvedTrack> for TrackView {
    fn from(t: &ResolvedTrack) -> Self {
        Self {
            title: t.title.clone(),
            artist: t.artist.clone(),
            spotify_id: t.catalog_id.to_string(),
            album: t.album.clone(),
            album_art: t.artwork_ref.clone(),
            preview_url: t.preview_ref.clone(),
            alternatives: None
        }
    }
}

impl From<&TrackGroup> for TrackView {
    fn from(g: &TrackGroup) -> Self {
        Self {
            alternatives: Some(g.alternates.iter().map(TrackView::from).collect()),
            ..TrackView::from(&g.primary)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistResponse {
    pub playlist_name: String,
    pub tracks: Vec<TrackView>
}

impl From<&PlaylistResult> for PlaylistResponse {
    fn from(p: &PlaylistResult) -> Self {
        Self {
            playlist_name: p.name.clone(),
            tracks: p.groups.iter().map(TrackView::from).collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Status { message: String },
    TrackFound { track: TrackView, count: usize },
    Complete { playlist: PlaylistResponse },
    Error { message: String }
}

impl PipelineEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Complete { .. } | PipelineEvent::Error { .. })
    }
}

/// Sending half handed through the pipeline. A disabled sink drops
/// everything; a gone receiver is not an error either
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<PipelineEvent>>
}

impl EventSink {
    pub fn disabled() -> Self { Self { tx: None } }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn is_enabled(&self) -> bool { self.tx.is_some() }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(PipelineEvent::Status { message: message.into() });
    }

    pub fn track_found(&self, track: &ResolvedTrack, count: usize) {
        if self.is_enabled() {
            self.emit(PipelineEvent::TrackFound { track: track.into(), count });
        }
    }
}
