use super::error::SourceError;
use super::model::{ProcessOptions, ProcessingResult};
use crate::domain::enrichment::EnrichmentService;
use crate::domain::feed::Item;
use crate::domain::observed::ObservedItemCache;
use crate::infrastructure::feeds::FeedClient;
use crate::infrastructure::repositories::CheckpointRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs one source's cycle: fetch, compare against the checkpoint, populate
/// the observed cache, enrich qualifying items and advance the checkpoint.
///
/// Only a failed fetch (or cancellation) fails the cycle. Checkpoint and
/// enrichment failures are logged and the cycle carries on.
pub struct SourceProcessor {
    feed_client: Arc<dyn FeedClient>,
    checkpoints: Arc<dyn CheckpointRepository>,
    observed: Arc<ObservedItemCache>,
    enrichment: Arc<dyn EnrichmentService>,
}

impl SourceProcessor {
    pub fn new(
        feed_client: Arc<dyn FeedClient>,
        checkpoints: Arc<dyn CheckpointRepository>,
        observed: Arc<ObservedItemCache>,
        enrichment: Arc<dyn EnrichmentService>,
    ) -> Self {
        Self {
            feed_client,
            checkpoints,
            observed,
            enrichment,
        }
    }

    pub async fn process(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
        options: ProcessOptions,
    ) -> ProcessingResult {
        match self.run(cancel, source_id, options).await {
            Ok(item) => ProcessingResult::ok(source_id, item),
            Err(e) => ProcessingResult::failed(source_id, e),
        }
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
        options: ProcessOptions,
    ) -> Result<Option<Item>, SourceError> {
        let feed = match self.feed_client.fetch_feed(cancel, source_id).await {
            Ok(feed) => feed,
            Err(e) if e.is_cancelled() => return Err(SourceError::Cancelled),
            Err(e) => {
                tracing::error!(source_id = %source_id, error = %e, "Failed to fetch feed");
                return Err(SourceError::Fetch(e));
            }
        };

        let stored = match self.checkpoints.get_last_checked(source_id).await {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!(
                    source_id = %source_id,
                    error = %e,
                    "Failed to read checkpoint, treating source as never checked"
                );
                None
            }
        };
        let baseline = if options.ignore_checkpoint {
            None
        } else {
            stored
        };

        let total = feed.items.len();
        let mut newest: Option<Item> = None;
        let mut latest: Option<DateTime<Utc>> = baseline;
        let mut qualifying = 0usize;

        for item in feed.items {
            self.observed.upsert(source_id, item.clone());

            if !is_newer(item.published, baseline) {
                continue;
            }

            let item = self.enrich(cancel, source_id, item).await?;

            if is_newer(item.published, latest) {
                latest = Some(item.published);
            }
            if newest
                .as_ref()
                .map_or(true, |current| item.published > current.published)
            {
                newest = Some(item);
            }

            qualifying += 1;
            if options.max_items > 0 && qualifying >= options.max_items {
                tracing::debug!(
                    source_id = %source_id,
                    max_items = options.max_items,
                    "Item cap reached, remaining feed entries skipped"
                );
                break;
            }
        }

        if !options.ignore_checkpoint && latest != stored {
            if let Some(at) = latest {
                if let Err(e) = self.checkpoints.set_last_checked(source_id, at).await {
                    tracing::warn!(
                        source_id = %source_id,
                        checkpoint = %at,
                        error = %e,
                        "Failed to persist checkpoint"
                    );
                }
            }
        }

        tracing::info!(
            source_id = %source_id,
            items = total,
            qualifying,
            surfaced = newest.as_ref().map(|i| i.id.as_str()).unwrap_or("-"),
            "Source processed"
        );

        Ok(newest)
    }

    /// Best-effort: on failure the item keeps its primary metadata.
    async fn enrich(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
        mut item: Item,
    ) -> Result<Item, SourceError> {
        match self.enrichment.enrich(cancel, &mut item).await {
            Ok(()) => {
                if !item.details.is_empty() {
                    self.observed.upsert(source_id, item.clone());
                }
            }
            Err(e) if e.is_cancelled() => return Err(SourceError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    source_id = %source_id,
                    item_id = %item.id,
                    error = %e,
                    "Enrichment failed, continuing with feed metadata"
                );
            }
        }
        Ok(item)
    }
}

fn is_newer(published: DateTime<Utc>, checkpoint: Option<DateTime<Utc>>) -> bool {
    checkpoint.map_or(true, |checkpoint| published > checkpoint)
}
