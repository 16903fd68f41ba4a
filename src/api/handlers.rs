use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use super::dtos::{ErrorResponse, LogsQuery, PoliciesQuery, SiteSummary};
use crate::{
    app_state::AppState,
    crawler::CrawlError,
    entities::{CrawlLogEntry, PolicyStats, RunReport, SchedulerState, StoredPolicy},
};

/// Handler failure rendered as `{ "error": ... }`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl From<CrawlError> for ApiError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::UnknownSite(_) => Self::NotFound(err.to_string()),
            CrawlError::AlreadyRunning => Self::Conflict(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

pub async fn list_sites(State(state): State<AppState>) -> Json<Vec<SiteSummary>> {
    Json(
        state
            .crawler
            .list_sites()
            .iter()
            .map(SiteSummary::from)
            .collect(),
    )
}

// Crawls run on their own task: a dropped request must not stop a site mid-run.
pub async fn run_all(State(state): State<AppState>) -> Result<Json<RunReport>, ApiError> {
    info!("manual crawl of all sites requested");
    let crawler = Arc::clone(&state.crawler);
    let report = tokio::spawn(async move { crawler.run_all().await })
        .await
        .context("crawl task failed")??;
    Ok(Json(report))
}

pub async fn run_one(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
) -> Result<Json<CrawlLogEntry>, ApiError> {
    info!(site = %site_id, "manual crawl requested");
    let crawler = Arc::clone(&state.crawler);
    let entry = tokio::spawn(async move { crawler.run_one(&site_id).await })
        .await
        .context("crawl task failed")??;
    Ok(Json(entry))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<CrawlLogEntry>>, ApiError> {
    Ok(Json(state.crawler.list_logs(query.limit()).await?))
}

pub async fn scheduler_state(State(state): State<AppState>) -> Json<SchedulerState> {
    Json(state.scheduler.state().await)
}

pub async fn toggle_scheduler(State(state): State<AppState>) -> Json<SchedulerState> {
    Json(state.scheduler.toggle().await)
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<PolicyStats>, ApiError> {
    Ok(Json(state.store().aggregate().await?))
}

pub async fn list_policies(
    State(state): State<AppState>,
    Query(query): Query<PoliciesQuery>,
) -> Result<Json<Vec<StoredPolicy>>, ApiError> {
    query.validate().map_err(ApiError::BadRequest)?;
    Ok(Json(state.store().query_policies(&query.into()).await?))
}
