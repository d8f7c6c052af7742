use crate::domain::feed::Source;
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable per-source novelty checkpoint.
///
/// Implementations must be safe to call concurrently for different sources.
/// A source that was never checked reads as `None`.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    async fn get_last_checked(&self, source_id: &str) -> AppResult<Option<DateTime<Utc>>>;

    /// Creates the source record if it does not exist yet. A value older
    /// than the stored checkpoint is ignored.
    async fn set_last_checked(&self, source_id: &str, at: DateTime<Utc>) -> AppResult<()>;
}

/// The set of tracked sources.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn list_sources(&self) -> AppResult<Vec<Source>>;

    /// Insert a source or update its title. The checkpoint is left untouched.
    async fn upsert_source(&self, source: &Source) -> AppResult<()>;
}
