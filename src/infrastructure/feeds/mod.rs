pub mod error;
pub mod parser;
pub mod rss;

pub use error::FeedClientError;
pub use rss::RssFeedClient;

use crate::domain::feed::Feed;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Fetches and parses one source's feed.
///
/// Implementations own their retry policy; callers treat any error as a
/// failed fetch for that source.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_feed(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
    ) -> Result<Feed, FeedClientError>;
}
