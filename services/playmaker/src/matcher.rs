//!
//! src/matcher.rs  Oct 2nd, 2026
//!
//! Resolves one suggested track to a single catalog entry. Strategies
//! run in order: "{track} {artist}" with album disambiguation, then
//! quoted track + artist, then the quoted track alone
//!

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::provider::CatalogResolver;
use crate::types::{CandidateDescriptor, ResolvedTrack};

const PRIMARY_LIMIT: u32 = 10;
const QUOTED_LIMIT: u32 = 5;

/// Words too generic to tell two albums apart
const ALBUM_STOPLIST: [&str; 16] = [
    "the", "a", "an", "and", "or", "of", "in", "on", "at", "to", "for",
    "soundtrack", "greatest", "hits", "best", "collection"
];

fn album_tokens(album: &str) -> HashSet<String> {
    album.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !ALBUM_STOPLIST.contains(&t.as_str()))
        .collect()
}

/// Picks the candidate whose album best matches the wanted album.
/// An equal album wins outright, then one containing it, then the
/// highest token overlap; the earliest ranked candidate wins ties and
/// the no-overlap case
pub fn pick_by_album(wanted: &str, candidates: &[ResolvedTrack]) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let wanted_lower = wanted.trim().to_lowercase();
    if wanted_lower.is_empty() {
        return Some(0);
    }

    let album_of = |c: &ResolvedTrack| c.album.as_deref().map(|a| a.trim().to_lowercase());
    let exact = candidates.iter()
        .position(|c| album_of(c).is_some_and(|a| a == wanted_lower))
        .or_else(|| {
            candidates.iter()
                .position(|c| album_of(c).is_some_and(|a| a.contains(&wanted_lower)))
        });
    if exact.is_some() {
        return exact;
    }

    let wanted_tokens = album_tokens(wanted);
    let mut best = (0, 0_usize);
    for (idx, candidate) in candidates.iter().enumerate() {
        let overlap = candidate.album.as_deref()
            .map(|a| album_tokens(a).intersection(&wanted_tokens).count())
            .unwrap_or(0);
        if overlap > best.1 {
            best = (idx, overlap);
        }
    }
    Some(best.0)
}

/// Outcome of one search strategy
enum Attempt {
    Found(Vec<ResolvedTrack>),
    Empty,
    Abort
}

pub struct TrackMatcher {
    catalog: Arc<dyn CatalogResolver>
}

impl TrackMatcher {
    pub fn new(catalog: Arc<dyn CatalogResolver>) -> Self {
        Self { catalog }
    }

    async fn attempt(&self, strategy: &'static str, query: &str, limit: u32) -> Attempt {
        match self.catalog.search(query, limit).await {
            Ok(found) if !found.is_empty() => Attempt::Found(found),
            Ok(_) => Attempt::Empty,
            Err(e) if e.is_transient() => {
                warn!(strategy, query, error = %e, "matcher.strategy.failed");
                Attempt::Empty
            }
            Err(e) => {
                warn!(strategy, query, error = %e, "matcher.abort");
                Attempt::Abort
            }
        }
    }

    /// Best single catalog match, None when every strategy comes up empty
    /// or the catalog refuses the request outright. Never errors
    pub async fn resolve(&self, descriptor: &CandidateDescriptor) -> Option<ResolvedTrack> {
        let name = descriptor.track_name.trim();
        let artist = descriptor.artist.trim();

        let primary = format!("{name} {artist}");
        match self.attempt("primary", &primary, PRIMARY_LIMIT).await {
            Attempt::Found(mut candidates) => {
                let idx = if descriptor.has_known_album() {
                    pick_by_album(&descriptor.album, &candidates).unwrap_or(0)
                } else {
                    0
                };
                debug!(track = name, artist, pick = idx, "matcher.primary");
                return Some(candidates.swap_remove(idx));
            }
            Attempt::Abort => return None,
            Attempt::Empty => {}
        }

        let fallbacks = [
            ("quoted_with_artist", format!("\"{name}\" {artist}")),
            ("quoted", format!("\"{name}\""))
        ];
        for (strategy, query) in fallbacks {
            match self.attempt(strategy, &query, QUOTED_LIMIT).await {
                Attempt::Found(candidates) => {
                    debug!(track = name, artist, strategy, "matcher.fallback");
                    return candidates.into_iter().next();
                }
                Attempt::Abort => return None,
                Attempt::Empty => {}
            }
        }

        debug!(track = name, artist, "matcher.unresolved");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::testing::{track, track_on_album, FakeCatalog};

    fn matcher(catalog: FakeCatalog) -> (TrackMatcher, Arc<FakeCatalog>) {
        let catalog = Arc::new(catalog);
        (TrackMatcher::new(catalog.clone()), catalog)
    }

    #[test]
    fn equal_album_beats_earlier_containing_one() {
        let candidates = vec![
            track_on_album("1", "Rolling in the Deep", "2112"),
            track_on_album("2", "Rolling in the Deep", "21")
        ];
        assert_eq!(pick_by_album("21", &candidates), Some(1));
        assert_eq!(pick_by_album("211", &candidates), Some(0));
    }

    #[test]
    fn token_overlap_beats_rank() {
        let candidates = vec![
            track_on_album("1", "Come Together", "Studio"),
            track_on_album("2", "Come Together", "Abbey Road Sessions (Remastered)")
        ];
        assert_eq!(pick_by_album("Abbey Road Sessions", &candidates), Some(1));
        assert_eq!(pick_by_album("abbey road", &candidates), Some(1));
    }

    #[test]
    fn stoplist_words_do_not_count() {
        let candidates = vec![
            track_on_album("1", "x", "The Best Of"),
            track_on_album("2", "x", "Greatest Hits Collection")
        ];
        // only generic words overlap, first candidate stays
        assert_eq!(pick_by_album("The Greatest Hits of the Best", &candidates), Some(0));
    }

    #[test]
    fn overlap_uses_tokens_not_substrings() {
        let candidates = vec![
            track_on_album("1", "x", "Live in Berlin"),
            track_on_album("2", "x", "Rumours Live"),
            track_on_album("3", "x", "Rumours (Deluxe Live Edition)")
        ];
        // "rumours" + "live" tie between 2 and 3, earliest wins
        assert_eq!(pick_by_album("Live Rumours Tour", &candidates), Some(1));
    }

    #[tokio::test]
    async fn known_album_disambiguates_primary_results() {
        let (m, _) = matcher(FakeCatalog::new().with_search(
            "Come Together The Beatles",
            vec![
                track_on_album("studio", "Come Together", "Studio"),
                track_on_album("sessions", "Come Together", "Abbey Road Sessions (Remastered)")
            ]
        ));
        let d = CandidateDescriptor::new("Come Together", "The Beatles")
            .with_album("Abbey Road Sessions");
        let got = m.resolve(&d).await.unwrap();
        assert_eq!(got.catalog_id.as_str(), "sessions");
    }

    #[tokio::test]
    async fn unknown_album_takes_top_result() {
        let (m, _) = matcher(FakeCatalog::new().with_search(
            "Africa Toto",
            vec![track("top", "Africa"), track("second", "Africa (Live)")]
        ));
        let got = m.resolve(&CandidateDescriptor::new("Africa", "Toto")).await.unwrap();
        assert_eq!(got.catalog_id.as_str(), "top");
    }

    #[tokio::test]
    async fn strategies_run_in_order() {
        let (m, catalog) = matcher(FakeCatalog::new().with_search(
            "\"Africa\"",
            vec![track("quoted", "Africa")]
        ));
        let got = m.resolve(&CandidateDescriptor::new("Africa", "Toto")).await.unwrap();
        assert_eq!(got.catalog_id.as_str(), "quoted");
        assert_eq!(catalog.queries(), vec![
            "Africa Toto".to_string(),
            "\"Africa\" Toto".to_string(),
            "\"Africa\"".to_string()
        ]);
    }

    #[tokio::test]
    async fn exhausted_strategies_resolve_to_none() {
        let (m, catalog) = matcher(FakeCatalog::new());
        assert!(m.resolve(&CandidateDescriptor::new("Nothing", "Nobody")).await.is_none());
        assert_eq!(catalog.search_calls(), 3);
    }

    #[tokio::test]
    async fn transient_failure_moves_to_next_strategy() {
        let (m, _) = matcher(
            FakeCatalog::new()
                .fail_query("Africa Toto", ProviderError::Timeout("slow".into()))
                .with_search("\"Africa\" Toto", vec![track("fallback", "Africa")])
        );
        let got = m.resolve(&CandidateDescriptor::new("Africa", "Toto")).await.unwrap();
        assert_eq!(got.catalog_id.as_str(), "fallback");
    }

    #[tokio::test]
    async fn hard_failure_aborts_descriptor() {
        let (m, catalog) = matcher(
            FakeCatalog::new()
                .fail_query("Africa Toto", ProviderError::Auth("expired".into()))
                .with_search("\"Africa\" Toto", vec![track("never", "Africa")])
        );
        assert!(m.resolve(&CandidateDescriptor::new("Africa", "Toto")).await.is_none());
        assert_eq!(catalog.search_calls(), 1);
    }
}
