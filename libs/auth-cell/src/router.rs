use axum::{
    routing::{get, post},
    Router,
};

use shared_database::AppState;

use crate::handlers;

pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/verify-email", get(handlers::verify_email))
        .with_state(state)
}
