use super::error::SourceError;
use super::model::{ProcessOptions, ProcessingResult};
use super::processor::SourceProcessor;
use crate::domain::feed::Source;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const MAX_CONCURRENCY: usize = 10;

/// 0 selects the default; anything above [`MAX_CONCURRENCY`] is capped.
pub fn effective_limit(requested: usize) -> usize {
    match requested {
        0 => DEFAULT_CONCURRENCY,
        n => n.min(MAX_CONCURRENCY),
    }
}

/// Fans the source processor out over every source with bounded parallelism.
pub struct PollDispatcher {
    processor: Arc<SourceProcessor>,
    limit: usize,
}

impl PollDispatcher {
    pub fn new(processor: Arc<SourceProcessor>, limit: usize) -> Self {
        Self {
            processor,
            limit: effective_limit(limit),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns exactly one result per distinct source identifier.
    ///
    /// Once `cancel` fires no further sources are launched; those get a
    /// [`SourceError::Cancelled`] result while in-flight tasks wind down through
    /// their own cancellation handling. Results already produced are kept.
    pub async fn dispatch(
        &self,
        cancel: &CancellationToken,
        sources: &[Source],
        options: ProcessOptions,
    ) -> HashMap<String, ProcessingResult> {
        let mut results = HashMap::with_capacity(sources.len());
        if sources.is_empty() {
            return results;
        }

        let mut seen = HashSet::new();
        let source_ids: Vec<&str> = sources
            .iter()
            .map(|s| s.id.as_str())
            .filter(|id| seen.insert(*id))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.limit));
        let mut tasks = JoinSet::new();
        let mut launched = HashMap::with_capacity(source_ids.len());

        for source_id in &source_ids {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let processor = self.processor.clone();
            let cancel = cancel.clone();
            let id = source_id.to_string();

            let handle = tasks.spawn(async move {
                let _permit = permit;
                processor.process(&cancel, &id, options).await
            });
            launched.insert(handle.id(), *source_id);
        }

        let mut task_failures: HashMap<&str, String> = HashMap::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, result)) => {
                    results.insert(result.source_id.clone(), result);
                }
                Err(e) => {
                    let Some(source_id) = launched.get(&e.id()).copied() else {
                        tracing::error!(error = %e, "Unknown task did not complete");
                        continue;
                    };
                    tracing::error!(source_id, error = %e, "Source task did not complete");
                    task_failures.insert(source_id, e.to_string());
                }
            }
        }

        for source_id in source_ids {
            if results.contains_key(source_id) {
                continue;
            }
            let error = match task_failures.remove(source_id) {
                Some(message) => SourceError::TaskFailed(message),
                None => SourceError::Cancelled,
            };
            results.insert(
                source_id.to_string(),
                ProcessingResult::failed(source_id, error),
            );
        }

        results
    }
}
