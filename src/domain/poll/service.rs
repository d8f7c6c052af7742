use super::dispatcher::PollDispatcher;
use super::model::{CycleSummary, ProcessOptions, ProcessingResult};
use crate::domain::feed::Source;
use crate::domain::notify::{NotificationSink, SurfacedItem};
use crate::domain::observed::ObservedItemCache;
use crate::error::AppResult;
use crate::infrastructure::repositories::SourceCatalog;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Drives dispatch waves over the tracked sources and hands the surfaced
/// items to the notification sink.
pub struct PollService {
    catalog: Arc<dyn SourceCatalog>,
    dispatcher: PollDispatcher,
    observed: Arc<ObservedItemCache>,
    sink: Arc<dyn NotificationSink>,
    options: ProcessOptions,
    last_summary: RwLock<Option<CycleSummary>>,
}

impl PollService {
    pub fn new(
        catalog: Arc<dyn SourceCatalog>,
        dispatcher: PollDispatcher,
        observed: Arc<ObservedItemCache>,
        sink: Arc<dyn NotificationSink>,
        options: ProcessOptions,
    ) -> Self {
        Self {
            catalog,
            dispatcher,
            observed,
            sink,
            options,
            last_summary: RwLock::new(None),
        }
    }

    pub fn last_summary(&self) -> Option<CycleSummary> {
        self.last_summary.read().clone()
    }

    pub fn observed(&self) -> &Arc<ObservedItemCache> {
        &self.observed
    }

    /// One wave over every tracked source.
    ///
    /// Only a failure to list the sources is returned as an error; per-source
    /// failures are counted in the summary.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> AppResult<CycleSummary> {
        let started_at = Utc::now();
        let sources = self.catalog.list_sources().await?;

        tracing::info!(
            sources = sources.len(),
            concurrency = self.dispatcher.limit(),
            "Starting poll cycle"
        );

        let results = self.dispatcher.dispatch(cancel, &sources, self.options).await;
        let summary = CycleSummary::from_results(results.values(), started_at, Utc::now());

        let surfaced = surfaced_items(&sources, results);
        if !surfaced.is_empty() {
            if let Err(e) = self.sink.notify(&surfaced).await {
                tracing::warn!(items = surfaced.len(), error = %e, "Notification sink failed");
            }
        }

        if cancel.is_cancelled() {
            tracing::warn!(
                processed = summary.processed,
                cancelled = summary.cancelled,
                "Poll cycle cancelled"
            );
        } else {
            self.observed.mark_refreshed();
            let purged = self.observed.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Expired observed items purged");
            }
        }

        tracing::info!(
            processed = summary.processed,
            errored = summary.errored,
            surfaced = summary.surfaced,
            duration_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
            "Poll cycle finished"
        );

        *self.last_summary.write() = Some(summary.clone());
        Ok(summary)
    }

    /// Runs a cycle every `interval` until `cancel` fires. A tick that comes
    /// due while a cycle is still running is skipped.
    pub async fn run(&self, cancel: CancellationToken, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.run_cycle(&cancel).await {
                tracing::error!(error = %e, "Poll cycle failed");
            }
        }

        tracing::info!("Poll loop stopped");
    }
}

/// Newest published first.
fn surfaced_items(
    sources: &[Source],
    results: HashMap<String, ProcessingResult>,
) -> Vec<SurfacedItem> {
    let titles: HashMap<&str, &str> = sources
        .iter()
        .map(|s| (s.id.as_str(), s.display_title()))
        .collect();

    let mut surfaced: Vec<SurfacedItem> = results
        .into_values()
        .filter_map(|result| {
            let item = result.outcome.ok().flatten()?;
            let source_title = titles
                .get(result.source_id.as_str())
                .map(|t| t.to_string())
                .unwrap_or_else(|| result.source_id.clone());
            Some(SurfacedItem {
                source_id: result.source_id,
                source_title,
                item,
            })
        })
        .collect();

    surfaced.sort_by(|a, b| b.item.published.cmp(&a.item.published));
    surfaced
}
