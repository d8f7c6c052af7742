use crate::domain::feed::Item;
use async_trait::async_trait;
use serde::Serialize;

/// An item picked for notification in one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SurfacedItem {
    pub source_id: String,
    pub source_title: String,
    pub item: Item,
}

/// Receives the surfaced items of one cycle, newest first.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, items: &[SurfacedItem]) -> anyhow::Result<()>;
}

/// Writes surfaced items to the log.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, items: &[SurfacedItem]) -> anyhow::Result<()> {
        for surfaced in items {
            tracing::info!(
                source_id = %surfaced.source_id,
                source = %surfaced.source_title,
                item_id = %surfaced.item.id,
                title = %surfaced.item.title,
                link = %surfaced.item.link,
                published = %surfaced.item.published,
                "New item"
            );
        }
        Ok(())
    }
}
