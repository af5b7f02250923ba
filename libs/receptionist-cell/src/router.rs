use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::session_middleware;

use crate::handlers::*;

pub fn receptionist_routes(state: AppState) -> Router {
    Router::new()
        .route("/appointments", post(create_appointment))
        .route("/appointments/{id}", patch(cancel_appointment))
        .route("/patients/{patientId}/appointments", get(patient_appointments))
        .route("/availableSlots", get(available_slots))
        .route("/assignRoom", get(room_board).post(assign_room))
        .route("/visits/checkin", post(check_in))
        .route("/visits/today", get(today_visits))
        .route("/stats/visitsToday", get(visits_today_stats))
        .route("/users", get(list_users))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .with_state(state)
}
