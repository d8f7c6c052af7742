use super::error::FeedClientError;
use super::parser::parse_feed;
use super::FeedClient;
use crate::domain::feed::Feed;
use crate::domain::retry::{BackoffExecutor, RetryDecision};
use crate::infrastructure::http::client::{classify_status, is_transient, retry_after};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Placeholder substituted with the (URL-encoded) source identifier.
pub const SOURCE_ID_PLACEHOLDER: &str = "{id}";

/// HTTP feed client for RSS 2.0 and Atom sources.
pub struct RssFeedClient {
    http_client: reqwest::Client,
    url_template: String,
    executor: BackoffExecutor,
}

impl RssFeedClient {
    pub fn new(
        http_client: reqwest::Client,
        url_template: String,
        executor: BackoffExecutor,
    ) -> Self {
        Self {
            http_client,
            url_template,
            executor,
        }
    }

    pub fn feed_url(&self, source_id: &str) -> String {
        self.url_template
            .replace(SOURCE_ID_PLACEHOLDER, &urlencoding::encode(source_id))
    }

    async fn download(&self, url: &str) -> Result<String, FeedClientError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedClientError::Status {
                status: status.as_u16(),
                retry_after: retry_after(response.headers()),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_transport(e, url))
    }
}

fn classify_transport(err: reqwest::Error, url: &str) -> FeedClientError {
    if is_transient(&err) {
        FeedClientError::Request(format!("{}: {}", url, err))
    } else {
        FeedClientError::Parse(format!("{}: {}", url, err))
    }
}

fn classify(err: &FeedClientError) -> RetryDecision {
    match err {
        FeedClientError::Request(_) => RetryDecision::Retry,
        FeedClientError::Status {
            status,
            retry_after,
        } => classify_status(*status, *retry_after),
        FeedClientError::Parse(_) | FeedClientError::Retry(_) => RetryDecision::Abort,
    }
}

#[async_trait]
impl FeedClient for RssFeedClient {
    async fn fetch_feed(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
    ) -> Result<Feed, FeedClientError> {
        let url = self.feed_url(source_id);
        let started = std::time::Instant::now();

        let body = self
            .executor
            .run(cancel, "fetch_feed", || self.download(&url), classify)
            .await?;

        let feed = parse_feed(&body)?;

        tracing::debug!(
            source_id = %source_id,
            url = %url,
            items = feed.items.len(),
            latency_ms = started.elapsed().as_millis(),
            "Feed fetched"
        );

        Ok(feed)
    }
}
