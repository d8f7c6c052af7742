pub mod cache;
pub mod error;

pub use cache::EnrichmentCache;
pub use error::EnrichmentError;

use crate::domain::feed::Item;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Best-effort secondary metadata for an item.
///
/// Implementations mutate `item.details` in place. On error the item keeps
/// whatever it already had.
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    async fn enrich(
        &self,
        cancel: &CancellationToken,
        item: &mut Item,
    ) -> Result<(), EnrichmentError>;
}

/// Used when no enrichment endpoint is configured.
pub struct NoopEnrichmentService;

#[async_trait]
impl EnrichmentService for NoopEnrichmentService {
    async fn enrich(
        &self,
        _cancel: &CancellationToken,
        _item: &mut Item,
    ) -> Result<(), EnrichmentError> {
        Ok(())
    }
}
