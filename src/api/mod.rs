//! Admin HTTP surface over the crawler and scheduler.

pub mod dtos;
pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{app_state::AppState, health::health_check};

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/sites", get(handlers::list_sites))
        .route("/crawl", post(handlers::run_all))
        .route("/crawl/{site_id}", post(handlers::run_one))
        .route("/logs", get(handlers::list_logs))
        .route("/scheduler", get(handlers::scheduler_state))
        .route("/scheduler/toggle", post(handlers::toggle_scheduler));

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/stats", get(handlers::stats))
        .route("/api/policies", get(handlers::list_policies))
        .nest("/api/admin", admin)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
