use crate::domain::retry::RetryDecision;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

const USER_AGENT: &str = concat!("feedwatch/", env!("CARGO_PKG_VERSION"));

/// Upper bound on a server-supplied `Retry-After` delay.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Shared outbound client for feed and enrichment calls.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Parse a `Retry-After` header, either delta-seconds or an HTTP date,
/// capped at [`MAX_RETRY_AFTER`].
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    parse_retry_after(raw, Utc::now())
}

fn parse_retry_after(raw: &str, now: DateTime<Utc>) -> Option<Duration> {
    let delay = match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => {
            let at = DateTime::parse_from_rfc2822(raw).ok()?.with_timezone(&Utc);
            (at - now).to_std().unwrap_or(Duration::ZERO)
        }
    };
    Some(delay.min(MAX_RETRY_AFTER))
}

/// Transport-level failures worth another attempt: timeouts, connection
/// problems and interrupted bodies.
pub fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

/// 408, 429 and 5xx retry (429/503 prefer the server's hint); every other status is terminal.
pub fn classify_status(status: u16, retry_after: Option<Duration>) -> RetryDecision {
    match status {
        429 | 503 => retry_after
            .map(RetryDecision::RetryAfter)
            .unwrap_or(RetryDecision::Retry),
        408 | 500..=599 => RetryDecision::Retry,
        _ => RetryDecision::Abort,
    }
}
