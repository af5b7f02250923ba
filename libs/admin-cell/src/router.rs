use axum::{
    middleware,
    routing::{get, patch},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::session_middleware;

use crate::handlers::*;

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/admins", get(list_admins).post(create_admin))
        .route("/admins/{id}", patch(update_admin).delete(delete_admin))
        .route("/appointments", get(list_appointments))
        .route("/patients", get(list_patients))
        .route("/logs", get(list_logs))
        .route("/statistics", get(statistics))
        .route("/queues", get(list_queues))
        .route("/doctors", get(list_doctors).post(create_doctor))
        .route("/doctors/{id}", patch(update_doctor).delete(delete_doctor))
        .route("/receptionists", get(list_receptionists).post(create_receptionist))
        .route(
            "/receptionists/{id}",
            get(get_receptionist).patch(update_receptionist).delete(delete_receptionist),
        )
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{id}", get(get_room).patch(update_room).delete(delete_room))
        .route("/specializations", get(list_specializations).post(create_specialization))
        .route(
            "/specializations/{id}",
            patch(update_specialization).delete(delete_specialization),
        )
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .with_state(state)
}
