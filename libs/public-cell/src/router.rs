use axum::{routing::get, Router};

use shared_database::AppState;

use crate::handlers::{health, landing};

/// Routes under `/api/public`; no session required.
pub fn public_routes(state: AppState) -> Router {
    Router::new().route("/landing", get(landing)).with_state(state)
}

pub fn health_routes(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}
