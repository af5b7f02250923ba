use axum::{extract::State, http::StatusCode, Json};

use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::{HealthReport, HealthStatus, LandingResponse};
use crate::services::{HealthService, LandingService};

#[utoipa::path(
    get,
    path = "/api/public/landing",
    responses((status = 200, body = LandingResponse)),
    tag = "public"
)]
#[axum::debug_handler]
pub async fn landing(State(state): State<AppState>) -> Result<Json<LandingResponse>, AppError> {
    Ok(Json(LandingService::landing(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, body = HealthReport),
        (status = 503, description = "Database or Redis unavailable", body = HealthReport),
    ),
    tag = "public"
)]
#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = HealthService::check(&state.db, &state.email_queue).await;
    let status = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(report))
}
