//!
//! src/assemble.rs  Oct 2nd, 2026
//!
//! Partitions resolved tracks into the fixed playlist shape: up to ten
//! groups of one primary and up to four alternates. Short pools give
//! fewer groups, never repeated tracks
//!

use std::collections::HashSet;

use crate::types::{ResolvedTrack, TrackGroup, GROUP_SIZE, MAX_GROUPS};

pub fn assemble(tracks: &[ResolvedTrack]) -> Vec<TrackGroup> {
    let mut seen = HashSet::new();
    let unique: Vec<&ResolvedTrack> = tracks.iter()
        .filter(|t| seen.insert(t.catalog_id.clone()))
        .take(GROUP_SIZE * MAX_GROUPS)
        .collect();

    unique.chunks(GROUP_SIZE)
        .take(MAX_GROUPS)
        .filter_map(|window| {
            let (primary, alternates) = window.split_first()?;
            Some(TrackGroup {
                primary: (*primary).clone(),
                alternates: alternates.iter().map(|t| (*t).clone()).collect()
            })
        })
        .collect()
}
