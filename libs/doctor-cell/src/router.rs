use axum::{
    middleware,
    routing::get,
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::session_middleware;

use crate::handlers;

pub fn doctor_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        // Visits
        .route(
            "/appointments/{id}",
            get(handlers::get_appointment).patch(handlers::complete_appointment),
        )
        .route("/visits", get(handlers::list_visits))
        .route("/visits/today", get(handlers::today_visits))
        .route("/patients", get(handlers::list_patients))

        // Working hours
        .route(
            "/dispositions",
            get(handlers::list_dispositions).post(handlers::save_dispositions),
        )
        .route("/dispositions/today", get(handlers::today_dispositions))

        // Dashboard statistics
        .route("/stats/handledVisits", get(handlers::handled_visits))
        .route("/stats/visitTypes", get(handlers::visit_types))

        .layer(middleware::from_fn_with_state(state.clone(), session_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
