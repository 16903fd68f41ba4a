use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// `running` while the triggers are enabled, `stopped` otherwise.
    pub scheduler: String,
    pub store: String,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let store = state.store();
    if let Err(err) = store.ping().await {
        error!(error = %err, store = store.backend(), "store health check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let scheduler = if state.scheduler.is_enabled().await {
        "running"
    } else {
        "stopped"
    };
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        scheduler: scheduler.to_string(),
        store: store.backend().to_string(),
    }))
}
