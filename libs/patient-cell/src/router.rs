use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::session_middleware;

use crate::handlers::*;

pub fn patient_routes(state: AppState) -> Router {
    Router::new()
        .route("/appointments", post(book_appointment))
        .route("/appointments/{id}", get(get_appointment).patch(cancel_appointment))
        .route("/visits", get(list_visits))
        .route("/upcomingVisits", get(upcoming_visits))
        .route("/prescriptions", get(list_prescriptions))
        .route("/prescriptions/{id}", patch(update_prescription))
        .route("/activePrescriptions", get(active_prescriptions))
        .route("/results", get(list_results))
        .route("/recentResults", get(recent_results))
        .route("/recommendations", get(list_recommendations))
        .route("/specializations", get(list_specializations))
        .route("/dashboard", get(dashboard))
        .route("/me", get(me))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .with_state(state)
}
