use super::error::SourceError;
use crate::domain::feed::Item;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-cycle knobs for the source processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Treat every source as never checked and leave stored checkpoints alone.
    pub ignore_checkpoint: bool,
    /// Stop after this many qualifying items; 0 means no cap.
    pub max_items: usize,
}

/// Outcome of one source's cycle.
#[derive(Debug)]
pub struct ProcessingResult {
    pub source_id: String,
    pub outcome: Result<Option<Item>, SourceError>,
}

impl ProcessingResult {
    pub fn ok(source_id: impl Into<String>, item: Option<Item>) -> Self {
        Self {
            source_id: source_id.into(),
            outcome: Ok(item),
        }
    }

    pub fn failed(source_id: impl Into<String>, error: SourceError) -> Self {
        Self {
            source_id: source_id.into(),
            outcome: Err(error),
        }
    }

    /// The newest qualifying item, if any.
    pub fn item(&self) -> Option<&Item> {
        self.outcome.as_ref().ok().and_then(Option::as_ref)
    }

    pub fn error(&self) -> Option<&SourceError> {
        self.outcome.as_ref().err()
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Aggregate of one dispatch wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub sources: usize,
    pub processed: usize,
    pub errored: usize,
    pub cancelled: usize,
    pub surfaced: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleSummary {
    pub fn from_results<'a>(
        results: impl IntoIterator<Item = &'a ProcessingResult>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let mut summary = Self {
            sources: 0,
            processed: 0,
            errored: 0,
            cancelled: 0,
            surfaced: 0,
            started_at,
            finished_at,
        };

        for result in results {
            summary.sources += 1;
            match &result.outcome {
                Ok(item) => {
                    summary.processed += 1;
                    if item.is_some() {
                        summary.surfaced += 1;
                    }
                }
                Err(e) if e.is_cancelled() => summary.cancelled += 1,
                Err(_) => summary.errored += 1,
            }
        }

        summary
    }
}
