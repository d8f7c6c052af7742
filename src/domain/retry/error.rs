use std::time::Duration;

/// Why [`super::BackoffExecutor::run`] gave up. Every variant except
/// `Cancelled` and `DeadlineExceeded` carries the last underlying error.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("non-retryable error: {0}")]
    NonRetryable(#[source] E),

    #[error("max retries exceeded after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        source: E,
    },

    #[error("retry budget of {budget:?} exhausted after {attempts} attempts: {source}")]
    Timeout {
        attempts: u32,
        budget: Duration,
        #[source]
        source: E,
    },

    /// The budget ran out while the first attempt was still in flight.
    #[error("retry budget of {budget:?} exhausted during attempt {attempts}")]
    DeadlineExceeded { attempts: u32, budget: Duration },

    #[error("operation cancelled")]
    Cancelled,
}

impl<E> RetryError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
