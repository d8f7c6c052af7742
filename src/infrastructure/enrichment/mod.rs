use crate::domain::enrichment::{EnrichmentCache, EnrichmentError, EnrichmentService};
use crate::domain::feed::{Item, ItemDetails};
use crate::domain::retry::{BackoffExecutor, RetryDecision};
use crate::infrastructure::http::client::{classify_status, is_transient, retry_after};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fetches secondary item metadata as JSON from `{base_url}/items/{id}`,
/// reading through the content-addressed [`EnrichmentCache`].
pub struct HttpEnrichmentService {
    http_client: reqwest::Client,
    base_url: String,
    cache: Arc<EnrichmentCache>,
    executor: BackoffExecutor,
    timeout: Duration,
}

impl HttpEnrichmentService {
    pub fn new(
        http_client: reqwest::Client,
        base_url: String,
        cache: Arc<EnrichmentCache>,
        executor: BackoffExecutor,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            executor,
            timeout,
        }
    }

    fn details_url(&self, item_id: &str) -> String {
        format!("{}/items/{}", self.base_url, urlencoding::encode(item_id))
    }

    async fn fetch_details(&self, url: &str) -> Result<ItemDetails, EnrichmentError> {
        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status {
                status: status.as_u16(),
                retry_after: retry_after(response.headers()),
            });
        }

        let body = response.text().await.map_err(classify_transport)?;
        serde_json::from_str::<ItemDetails>(&body)
            .map_err(|e| EnrichmentError::Malformed(e.to_string()))
    }
}

fn classify_transport(err: reqwest::Error) -> EnrichmentError {
    if is_transient(&err) {
        EnrichmentError::Request(err.to_string())
    } else {
        EnrichmentError::Malformed(err.to_string())
    }
}

fn classify(err: &EnrichmentError) -> RetryDecision {
    match err {
        EnrichmentError::Request(_) | EnrichmentError::TimedOut(_) => RetryDecision::Retry,
        EnrichmentError::Status {
            status,
            retry_after,
        } => classify_status(*status, *retry_after),
        EnrichmentError::Malformed(_)
        | EnrichmentError::Retry(_)
        | EnrichmentError::CacheIo(_)
        | EnrichmentError::CacheEncode(_) => RetryDecision::Abort,
    }
}

#[async_trait]
impl EnrichmentService for HttpEnrichmentService {
    async fn enrich(
        &self,
        cancel: &CancellationToken,
        item: &mut Item,
    ) -> Result<(), EnrichmentError> {
        if let Some(details) = self.cache.get(&item.id).await {
            item.details.merge(details);
            return Ok(());
        }

        let url = self.details_url(&item.id);
        let fetch = self
            .executor
            .run(cancel, "enrich_item", || self.fetch_details(&url), classify);

        let details = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => return Err(EnrichmentError::TimedOut(self.timeout)),
        };

        if let Err(e) = self.cache.put(&item.id, &details).await {
            tracing::warn!(item_id = %item.id, error = %e, "Failed to store enrichment in cache");
        }

        tracing::debug!(item_id = %item.id, "Item enriched");
        item.details.merge(details);
        Ok(())
    }
}
