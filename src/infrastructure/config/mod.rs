use crate::domain::feed::Source;
use crate::domain::poll::{effective_limit, ProcessOptions};
use crate::domain::retry::RetryConfig;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres checkpoint store; `None` keeps checkpoints in memory.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Feeds
    pub feed_url_template: String,
    pub tracked_sources: Vec<Source>,
    pub http_timeout: Duration,
    // Polling
    pub poll_interval: Duration,
    pub poll_run_once: bool,
    pub concurrency_limit: usize,
    pub max_items_per_cycle: usize,
    pub ignore_checkpoint: bool,
    pub observed_cache_ttl: Duration,
    // Enrichment
    pub enrichment_base_url: Option<String>,
    pub enrichment_cache_enabled: bool,
    pub enrichment_cache_dir: PathBuf,
    pub enrichment_timeout: Duration,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

pub const DEFAULT_FEED_URL_TEMPLATE: &str =
    "https://www.youtube.com/feeds/videos.xml?channel_id={id}";

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let retry = RetryConfig {
            max_retries: var_or("RETRY_MAX_RETRIES", "3").parse()?,
            initial_backoff: Duration::from_millis(
                var_or("RETRY_INITIAL_BACKOFF_MS", "1000").parse()?,
            ),
            max_backoff: Duration::from_millis(var_or("RETRY_MAX_BACKOFF_MS", "30000").parse()?),
            backoff_factor: var_or("RETRY_BACKOFF_FACTOR", "2.0").parse()?,
            max_total_timeout: Duration::from_secs(
                var_or("RETRY_MAX_TOTAL_TIMEOUT_SECS", "120").parse()?,
            ),
        };

        let config = Config {
            database_url: non_empty_var("DATABASE_URL"),
            host: var_or("HOST", "0.0.0.0"),
            port: var_or("PORT", "8080").parse()?,
            environment: match var_or("ENVIRONMENT", "development").as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match var_or("LOG_FORMAT", "pretty").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            feed_url_template: var_or("FEED_URL_TEMPLATE", DEFAULT_FEED_URL_TEMPLATE),
            tracked_sources: parse_tracked_sources(&var_or("TRACKED_SOURCES", "")),
            http_timeout: Duration::from_secs(var_or("HTTP_TIMEOUT_SECS", "20").parse()?),
            poll_interval: Duration::from_secs(var_or("POLL_INTERVAL_SECS", "900").parse()?),
            poll_run_once: flag("POLL_RUN_ONCE", false),
            concurrency_limit: effective_limit(var_or("CONCURRENCY_LIMIT", "5").parse()?),
            max_items_per_cycle: var_or("MAX_ITEMS_PER_CYCLE", "0").parse()?,
            ignore_checkpoint: flag("IGNORE_CHECKPOINT", false),
            observed_cache_ttl: Duration::from_secs(
                var_or("OBSERVED_CACHE_TTL_HOURS", "24").parse::<u64>()? * 3600,
            ),
            enrichment_base_url: non_empty_var("ENRICHMENT_BASE_URL"),
            enrichment_cache_enabled: flag("ENRICHMENT_CACHE_ENABLED", true),
            enrichment_cache_dir: PathBuf::from(var_or(
                "ENRICHMENT_CACHE_DIR",
                "./cache/enrichment",
            )),
            enrichment_timeout: Duration::from_secs(
                var_or("ENRICHMENT_TIMEOUT_SECS", "30").parse()?,
            ),
            retry,
        };

        if config.poll_interval.is_zero() {
            return Err("POLL_INTERVAL_SECS must be greater than zero".into());
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions {
            ignore_checkpoint: self.ignore_checkpoint,
            max_items: self.max_items_per_cycle,
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Parse `id[=title]` pairs separated by commas. Blank entries are skipped.
pub fn parse_tracked_sources(raw: &str) -> Vec<Source> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (id, title) = match entry.split_once('=') {
                Some((id, title)) => (id.trim(), Some(title.trim()).filter(|t| !t.is_empty())),
                None => (entry, None),
            };
            (!id.is_empty()).then(|| Source::new(id, title.map(str::to_string)))
        })
        .collect()
}
