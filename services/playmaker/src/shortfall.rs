//!
//! src/shortfall.rs  Oct 2nd, 2026
//!
//! Tops up an under-filled pool: more suggestions first, then generic
//! popularity searches straight against the catalog. Never fails, the
//! best pool it managed is returned
//!

use std::sync::Arc;

use tracing::{info, warn};

use crate::batch::BatchResolver;
use crate::config::PipelineConfig;
use crate::events::EventSink;
use crate::provider::{CatalogResolver, SuggestionSource};
use crate::types::Pool;

/// Last resort queries, tried in order
pub fn fallback_queries(query: &str) -> Vec<String> {
    let query = query.trim();
    let mut out = Vec::with_capacity(5);
    if !query.is_empty() {
        out.push(format!("{query} popular"));
        out.push(format!("{query} hits"));
    }
    out.extend(["popular songs", "top hits", "best songs"].map(str::to_string));
    out
}

pub struct ShortfallFiller {
    suggestions: Arc<dyn SuggestionSource>,
    catalog: Arc<dyn CatalogResolver>,
    margin: usize,
    rounds: usize,
    fallback_limit: u32
}

impl ShortfallFiller {
    pub fn new(
        suggestions: Arc<dyn SuggestionSource>,
        catalog: Arc<dyn CatalogResolver>,
        cfg: &PipelineConfig
    ) -> Self {
        Self {
            suggestions,
            catalog,
            margin: cfg.shortfall_margin,
            rounds: cfg.shortfall_rounds,
            fallback_limit: cfg.fallback_search_limit
        }
    }

    pub async fn ensure_minimum(
        &self,
        mut pool: Pool,
        query: &str,
        min_required: usize,
        resolver: &BatchResolver,
        events: &EventSink
    ) -> Pool {
        if pool.len() >= min_required {
            return pool;
        }
        let start = pool.len();
        warn!(pool = start, min_required, "shortfall.detected");
        events.status(format!(
            "Only found {start} tracks, looking for more..."
        ));

        for round in 0..self.rounds {
            if pool.len() >= min_required {
                break;
            }
            let needed = min_required - pool.len() + self.margin;
            let exclude = pool.exclusions();
            let more = match self.suggestions.suggest(query, needed, &exclude).await {
                Ok(more) => more,
                Err(e) => {
                    warn!(round, error = %e, "shortfall.suggest.failed");
                    break;
                }
            };
            if more.is_empty() {
                info!(round, "shortfall.suggest.empty");
                break;
            }
            let added = resolver.resolve_into(&mut pool, &more, min_required, events).await;
            info!(round, asked = needed, got = more.len(), added, pool = pool.len(),
                "shortfall.round");
            if added == 0 {
                break;
            }
        }

        if pool.len() < min_required {
            self.popular_fallback(&mut pool, query, min_required, events).await;
        }

        if pool.len() < min_required {
            warn!(pool = pool.len(), min_required, "shortfall.unfilled");
        } else {
            info!(from = start, to = pool.len(), "shortfall.filled");
        }
        pool
    }

    async fn popular_fallback(
        &self,
        pool: &mut Pool,
        query: &str,
        min_required: usize,
        events: &EventSink
    ) {
        for variant in fallback_queries(query) {
            if pool.len() >= min_required {
                return;
            }
            let found = match self.catalog.search(&variant, self.fallback_limit).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(variant, error = %e, "shortfall.fallback.failed");
                    continue;
                }
            };
            let before = pool.len();
            for track in found {
                if pool.len() >= min_required {
                    break;
                }
                if pool.push(track) {
                    if let Some(added) = pool.tracks().last() {
                        events.track_found(added, pool.len());
                    }
                }
            }
            info!(variant, added = pool.len() - before, pool = pool.len(), "shortfall.fallback");
        }
    }
}
