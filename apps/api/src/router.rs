use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use admin_cell::admin_routes;
use auth_cell::auth_routes;
use doctor_cell::doctor_routes;
use patient_cell::patient_routes;
use public_cell::{health_routes, public_routes};
use receptionist_cell::receptionist_routes;
use shared_database::AppState;

use crate::openapi::ApiDoc;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone()))
        .nest("/doctor", doctor_routes(state.clone()))
        .nest("/patient", patient_routes(state.clone()))
        .nest("/receptionist", receptionist_routes(state.clone()))
        .nest("/public", public_routes(state.clone()))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    Router::new()
        .route("/", get(|| async { "Przychodnia API is running!" }))
        .nest("/api", api)
        .merge(health_routes(state))
}
