//!
//! src/pipeline.rs  Oct 2nd, 2026
//!
//! End to end playlist generation: suggest, resolve, top up, assemble,
//! title. The streaming variant runs the same steps on a spawned task and
//! reports progress over a channel
//!

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, instrument};

use crate::assemble::assemble;
use crate::batch::BatchResolver;
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Stage};
use crate::events::{EventSink, PipelineEvent};
use crate::matcher::TrackMatcher;
use crate::provider::{CatalogResolver, SuggestionSource};
use crate::shortfall::ShortfallFiller;
use crate::types::PlaylistResult;

pub struct PlaylistPipeline {
    suggestions: Arc<dyn SuggestionSource>,
    resolver: BatchResolver,
    filler: ShortfallFiller,
    cfg: PipelineConfig
}

impl PlaylistPipeline {
    pub fn new(
        suggestions: Arc<dyn SuggestionSource>,
        catalog: Arc<dyn CatalogResolver>,
        cfg: PipelineConfig
    ) -> Self {
        let resolver = BatchResolver::new(
            TrackMatcher::new(catalog.clone()),
            cfg.batch_size,
            cfg.batch_delay
        );
        let filler = ShortfallFiller::new(suggestions.clone(), catalog, &cfg);
        Self { suggestions, resolver, filler, cfg }
    }

    pub async fn generate(&self, query: &str) -> Result<PlaylistResult, PipelineError> {
        self.generate_with_events(query, &EventSink::disabled()).await
    }

    /// Runs the pipeline, finishing the event stream with exactly one
    /// terminal event
    pub async fn generate_with_events(
        &self,
        query: &str,
        events: &EventSink
    ) -> Result<PlaylistResult, PipelineError> {
        match self.run(query, events).await {
            Ok(result) => {
                events.emit(PipelineEvent::Complete { playlist: (&result).into() });
                Ok(result)
            }
            Err(e) => {
                error!(stage = %e.stage, error = %e.source, "pipeline.failed");
                events.emit(PipelineEvent::Error { message: e.to_string() });
                Err(e)
            }
        }
    }

    /// Spawns a run owning this pipeline and returns the event receiver.
    /// The stream ends after a `complete` or `error` event
    pub fn spawn_stream(self: Arc<Self>, query: String) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (sink, rx) = EventSink::channel();
        tokio::spawn(async move {
            let _ = self.generate_with_events(&query, &sink).await;
        });
        rx
    }

    #[instrument(skip(self, events), fields(suggestions = self.cfg.suggestion_count))]
    async fn run(&self, query: &str, events: &EventSink) -> Result<PlaylistResult, PipelineError> {
        events.status("Generating song suggestions...");
        let descriptors = self.suggestions
            .suggest(query, self.cfg.suggestion_count, &[])
            .await
            .map_err(|e| PipelineError::new(Stage::Suggest, e))?;
        info!(got = descriptors.len(), "pipeline.suggested");

        events.status(format!(
            "Got {} suggestions, searching Spotify...", descriptors.len()
        ));
        let pool = self.resolver
            .resolve_all(&descriptors, self.cfg.target_pool_size, events)
            .await;

        let pool = self.filler
            .ensure_minimum(pool, query, self.cfg.min_required, &self.resolver, events)
            .await;

        events.status("Creating playlist...");
        let groups = assemble(pool.tracks());
        let name = self.suggestions.title(query).await;

        let result = PlaylistResult { name, groups };
        info!(
            name = %result.name,
            groups = result.groups.len(),
            tracks = result.track_count(),
            pool = pool.len(),
            "pipeline.complete"
        );
        Ok(result)
    }
}
