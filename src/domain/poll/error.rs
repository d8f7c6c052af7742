use crate::infrastructure::feeds::FeedClientError;

/// Why a single source produced no item this cycle.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("feed fetch failed: {0}")]
    Fetch(#[source] FeedClientError),

    #[error("cancelled")]
    Cancelled,

    #[error("source task failed: {0}")]
    TaskFailed(String),
}

impl SourceError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
