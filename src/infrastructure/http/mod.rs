pub mod client;
pub mod request_id;

use crate::controllers::health::{self, HealthState};
use axum::{middleware, routing::get, Router};
use request_id::request_id_middleware;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serve the health endpoints until `shutdown` fires.
pub async fn start_http_server(
    host: &str,
    port: u16,
    state: HealthState,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;

    tracing::info!("Health server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
