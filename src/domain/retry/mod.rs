//! Retry with exponential backoff, shared by every network-calling collaborator.

pub mod config;
pub mod error;

pub use config::RetryConfig;
pub use error::RetryError;

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Classification of a failed attempt, produced by the caller's predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Transient failure; wait the computed backoff.
    Retry,
    /// Transient failure with an explicit rate-limit hint that replaces the computed backoff.
    RetryAfter(Duration),
    /// Terminal failure; give up immediately.
    Abort,
}

#[derive(Debug, Clone, Default)]
pub struct BackoffExecutor {
    config: RetryConfig,
}

impl BackoffExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `operation` up to `max_retries + 1` times.
    ///
    /// `classify` decides whether a failure is worth another attempt. The
    /// cancellation token is observed both while an attempt is in flight and
    /// while waiting out a backoff; either way the call returns
    /// [`RetryError::Cancelled`] without waiting for the attempt to finish.
    /// An attempt still running when `max_total_timeout` elapses is dropped.
    pub async fn run<T, E, F, Fut, C>(
        &self,
        cancel: &CancellationToken,
        operation_name: &str,
        mut operation: F,
        classify: C,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDecision,
        E: std::fmt::Display,
    {
        let started = Instant::now();
        let deadline = started.checked_add(self.config.max_total_timeout);
        let mut backoff = self.config.initial_backoff;
        let mut attempt: u32 = 0;
        let mut last_err: Option<E> = None;

        loop {
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                outcome = operation() => outcome,
                _ = wait_until(deadline) => {
                    tracing::warn!(
                        operation = operation_name,
                        attempts = attempt,
                        budget_ms = self.config.max_total_timeout.as_millis(),
                        "Giving up: retry budget exhausted during attempt"
                    );
                    let budget = self.config.max_total_timeout;
                    return Err(match last_err.take() {
                        Some(source) => RetryError::Timeout {
                            attempts: attempt,
                            budget,
                            source,
                        },
                        None => RetryError::DeadlineExceeded {
                            attempts: attempt,
                            budget,
                        },
                    });
                }
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            elapsed_ms = started.elapsed().as_millis(),
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let delay = match classify(&err) {
                RetryDecision::Abort => {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Non-retryable failure"
                    );
                    return Err(RetryError::NonRetryable(err));
                }
                RetryDecision::Retry => backoff,
                RetryDecision::RetryAfter(hint) => hint,
            };

            if attempt > self.config.max_retries {
                tracing::warn!(
                    operation = operation_name,
                    attempts = attempt,
                    error = %err,
                    "Giving up: max retries exceeded"
                );
                return Err(RetryError::MaxRetriesExceeded {
                    attempts: attempt,
                    source: err,
                });
            }

            let elapsed = started.elapsed();
            if elapsed.saturating_add(delay) > self.config.max_total_timeout {
                tracing::warn!(
                    operation = operation_name,
                    attempts = attempt,
                    elapsed_ms = elapsed.as_millis(),
                    budget_ms = self.config.max_total_timeout.as_millis(),
                    error = %err,
                    "Giving up: retry budget exhausted"
                );
                return Err(RetryError::Timeout {
                    attempts: attempt,
                    budget: self.config.max_total_timeout,
                    source: err,
                });
            }

            tracing::warn!(
                operation = operation_name,
                attempt,
                backoff_ms = delay.as_millis(),
                error = %err,
                "Attempt failed, retrying after backoff"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            last_err = Some(err);
            backoff = self.config.next_backoff(backoff);
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
