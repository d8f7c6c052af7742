use crate::domain::retry::RetryError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("enrichment request failed: {0}")]
    Request(String),

    #[error("enrichment endpoint returned status {status}")]
    Status {
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("malformed enrichment payload: {0}")]
    Malformed(String),

    #[error("enrichment timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{0}")]
    Retry(#[source] Box<RetryError<EnrichmentError>>),

    #[error("enrichment cache I/O failed: {0}")]
    CacheIo(#[from] std::io::Error),

    #[error("enrichment cache entry could not be encoded: {0}")]
    CacheEncode(#[from] serde_json::Error),
}

impl EnrichmentError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Retry(inner) if inner.is_cancelled())
    }
}

impl From<RetryError<EnrichmentError>> for EnrichmentError {
    fn from(err: RetryError<EnrichmentError>) -> Self {
        Self::Retry(Box::new(err))
    }
}
