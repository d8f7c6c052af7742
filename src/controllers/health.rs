use crate::domain::poll::PollService;
use crate::error::{AppError, AppResult};
use crate::infrastructure::db::{check_connection, DbPool};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct HealthState {
    /// `None` when checkpoints live in memory.
    pub pool: Option<Arc<DbPool>>,
    pub poll_service: Arc<PollService>,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn health_ready(State(state): State<HealthState>) -> AppResult<impl IntoResponse> {
    let store = match &state.pool {
        None => "memory",
        Some(pool) => {
            check_connection(pool).await.map_err(|e| {
                AppError::ServiceUnavailable(format!("checkpoint store unreachable: {}", e))
            })?;
            "connected"
        }
    };

    let observed = state.poll_service.observed();

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "store": store,
            "observed_items": observed.len(),
            "last_refreshed_at": observed.last_refreshed_at(),
            "last_cycle": state.poll_service.last_summary(),
        })),
    ))
}
