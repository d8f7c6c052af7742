use crate::domain::retry::RetryError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FeedClientError {
    #[error("feed request failed: {0}")]
    Request(String),

    #[error("feed endpoint returned status {status}")]
    Status {
        status: u16,
        retry_after: Option<Duration>,
    },

    #[error("feed could not be parsed: {0}")]
    Parse(String),

    #[error("{0}")]
    Retry(#[source] Box<RetryError<FeedClientError>>),
}

impl FeedClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Retry(inner) if inner.is_cancelled())
    }
}

impl From<RetryError<FeedClientError>> for FeedClientError {
    fn from(err: RetryError<FeedClientError>) -> Self {
        Self::Retry(Box::new(err))
    }
}
