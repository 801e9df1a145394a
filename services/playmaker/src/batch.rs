//!
//! src/batch.rs  Oct 2nd, 2026
//!
//! Fans descriptors out to the matcher in fixed size batches and
//! collects unique results into a Pool
//!

use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::events::EventSink;
use crate::matcher::TrackMatcher;
use crate::types::{CandidateDescriptor, Pool};

pub struct BatchResolver {
    matcher: TrackMatcher,
    batch_size: usize,
    batch_delay: Duration
}

impl BatchResolver {
    pub fn new(matcher: TrackMatcher, batch_size: usize, batch_delay: Duration) -> Self {
        Self { matcher, batch_size: batch_size.max(1), batch_delay }
    }

    pub async fn resolve_all(
        &self,
        descriptors: &[CandidateDescriptor],
        target: usize,
        events: &EventSink
    ) -> Pool {
        let mut pool = Pool::new();
        self.resolve_into(&mut pool, descriptors, target, events).await;
        pool
    }

    /// Resolves descriptors into an existing pool until it holds `target`
    /// tracks. Returns how many tracks were appended
    pub async fn resolve_into(
        &self,
        pool: &mut Pool,
        descriptors: &[CandidateDescriptor],
        target: usize,
        events: &EventSink
    ) -> usize {
        let before = pool.len();
        let batches: Vec<_> = descriptors.chunks(self.batch_size).collect();
        let mut unresolved = 0_usize;

        for (idx, batch) in batches.iter().enumerate() {
            if pool.len() >= target {
                break;
            }
            if idx > 0 && !self.batch_delay.is_zero() {
                sleep(self.batch_delay).await;
            }

            // every task in the batch settles before anything is appended
            let results = join_all(batch.iter().map(|d| self.matcher.resolve(d))).await;

            for resolved in results {
                let Some(track) = resolved else {
                    unresolved += 1;
                    continue;
                };
                if pool.len() >= target {
                    break;
                }
                let id = track.catalog_id.clone();
                if pool.push(track) {
                    if let Some(added) = pool.tracks().last() {
                        events.track_found(added, pool.len());
                    }
                } else {
                    debug!(catalog_id = %id, "batch.duplicate");
                }
            }
            debug!(batch = idx, pool = pool.len(), "batch.done");
        }

        let added = pool.len() - before;
        info!(
            descriptors = descriptors.len(),
            added,
            unresolved,
            pool = pool.len(),
            target,
            "batch.resolve.done"
        );
        added
    }
}
