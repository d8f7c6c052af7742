use feedwatch::controllers::health::HealthState;
use feedwatch::domain::enrichment::{EnrichmentCache, EnrichmentService, NoopEnrichmentService};
use feedwatch::domain::notify::LogNotificationSink;
use feedwatch::domain::observed::ObservedItemCache;
use feedwatch::domain::poll::{PollDispatcher, PollService, SourceProcessor};
use feedwatch::domain::retry::BackoffExecutor;
use feedwatch::infrastructure::config::{Config, LogFormat};
use feedwatch::infrastructure::db::{check_connection, create_pool, run_migrations, DbPool};
use feedwatch::infrastructure::enrichment::HttpEnrichmentService;
use feedwatch::infrastructure::feeds::RssFeedClient;
use feedwatch::infrastructure::http::client::build_http_client;
use feedwatch::infrastructure::http::start_http_server;
use feedwatch::infrastructure::repositories::{
    CheckpointRepository, InMemorySourceRepository, SourceCatalog, SourceRepository,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    init_logging(&config);

    tracing::info!(
        environment = ?config.environment,
        concurrency = config.concurrency_limit,
        interval_secs = config.poll_interval.as_secs(),
        "Starting feedwatch"
    );

    // 1. Checkpoint store and source catalog
    let (pool, checkpoints, catalog) = match &config.database_url {
        Some(url) => {
            let pool = Arc::new(create_pool(url).await?);
            check_connection(&pool).await?;
            run_migrations(&pool).await?;
            tracing::info!("Database connection verified, migrations applied");

            let repo = Arc::new(SourceRepository::new(pool.clone()));
            (
                Some(pool),
                repo.clone() as Arc<dyn CheckpointRepository>,
                repo as Arc<dyn SourceCatalog>,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set, checkpoints will not survive a restart");
            let repo = Arc::new(InMemorySourceRepository::new());
            (
                None::<Arc<DbPool>>,
                repo.clone() as Arc<dyn CheckpointRepository>,
                repo as Arc<dyn SourceCatalog>,
            )
        }
    };

    for source in &config.tracked_sources {
        catalog.upsert_source(source).await?;
    }
    tracing::info!(
        seeded = config.tracked_sources.len(),
        "Tracked sources registered"
    );

    // 2. Outbound clients
    let http_client = build_http_client(config.http_timeout)?;
    let feed_client = Arc::new(RssFeedClient::new(
        http_client.clone(),
        config.feed_url_template.clone(),
        BackoffExecutor::new(config.retry.clone()),
    ));

    let enrichment: Arc<dyn EnrichmentService> = match &config.enrichment_base_url {
        Some(base_url) => {
            let cache = Arc::new(EnrichmentCache::new(
                &config.enrichment_cache_dir,
                config.enrichment_cache_enabled,
            ));
            tracing::info!(
                base_url = %base_url,
                cache_enabled = cache.is_enabled(),
                "Enrichment enabled"
            );
            Arc::new(HttpEnrichmentService::new(
                http_client,
                base_url.clone(),
                cache,
                BackoffExecutor::new(
                    config
                        .retry
                        .clone()
                        .with_total_timeout(config.enrichment_timeout),
                ),
                config.enrichment_timeout,
            ))
        }
        None => Arc::new(NoopEnrichmentService),
    };

    // 3. Core services
    let observed = Arc::new(ObservedItemCache::new(config.observed_cache_ttl));
    let processor = Arc::new(SourceProcessor::new(
        feed_client,
        checkpoints,
        observed.clone(),
        enrichment,
    ));
    let poll_service = Arc::new(PollService::new(
        catalog,
        PollDispatcher::new(processor, config.concurrency_limit),
        observed,
        Arc::new(LogNotificationSink),
        config.process_options(),
    ));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
            }
            shutdown.cancel();
        }
    });

    if config.poll_run_once {
        let summary = poll_service.run_cycle(&shutdown).await?;
        tracing::info!(
            processed = summary.processed,
            errored = summary.errored,
            "Single cycle complete"
        );
        return Ok(());
    }

    // 4. Health server alongside the poll loop
    let server = tokio::spawn({
        let state = HealthState {
            pool,
            poll_service: poll_service.clone(),
        };
        let host = config.host.clone();
        let port = config.port;
        let shutdown = shutdown.clone();
        async move { start_http_server(&host, port, state, shutdown).await }
    });

    poll_service.run(shutdown.clone(), config.poll_interval).await;

    shutdown.cancel();
    server.await??;

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "feedwatch=debug,tower_http=debug".into());

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
