use assert_matches::assert_matches;
use axum::{
    body::Body,
    extract::{Extension, Path, State},
    http::{Request, StatusCode},
    Json,
};
use tower::ServiceExt;

use appointment_cell::{AppointmentStatus, PrescriptionStatus};
use patient_cell::handlers::*;
use patient_cell::models::*;
use patient_cell::router::patient_routes;
use shared_models::auth::SessionUser;
use shared_models::error::AppError;
use shared_utils::test_utils::{SessionTestUtils, TestConfig, TestUser};

fn patient() -> Extension<SessionUser> {
    Extension(TestUser::patient("pacjent@example.com").to_user())
}

#[tokio::test]
async fn patient_routes_require_a_session() {
    let app = patient_routes(TestConfig::default().to_state());
    let response = app
        .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_session_cookie_is_rejected() {
    let config = TestConfig::default();
    let app = patient_routes(config.to_state());
    let cookie = SessionTestUtils::forged_cookie_header(&config.to_app_config(), "session-token");

    let response = app
        .oneshot(
            Request::get("/visits")
                .header("cookie", cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctors_cannot_use_patient_overview() {
    let state = TestConfig::default().to_state();
    let doctor = Extension(TestUser::doctor("lekarz@example.com").to_user());
    assert_matches!(upcoming_visits(State(state.clone()), doctor.clone()).await, Err(AppError::Forbidden(_)));
    assert_matches!(me(State(state), doctor).await, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn receptionists_cannot_read_patient_dashboard() {
    let state = TestConfig::default().to_state();
    let receptionist = Extension(TestUser::receptionist("recepcja@example.com").to_user());
    assert_matches!(dashboard(State(state), receptionist).await, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn malformed_appointment_id_is_rejected() {
    let state = TestConfig::default().to_state();
    let result = get_appointment(State(state), patient(), Path("1e3".to_string())).await;
    assert_matches!(result, Err(AppError::BadRequest(m)) if m == "Nieprawidłowy identyfikator wizyty");
}

#[tokio::test]
async fn patients_may_only_request_cancellation() {
    let state = TestConfig::default().to_state();
    let request = UpdateAppointmentStatusRequest { status: AppointmentStatus::Completed };
    let result = cancel_appointment(State(state), patient(), Path("5".to_string()), Ok(Json(request))).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn booking_notes_over_limit_are_rejected() {
    let state = TestConfig::default().to_state();
    let request = BookVisitRequest {
        doctor_id: "doctor-1".into(),
        datetime: "2030-01-07T09:00:00".into(),
        is_online: false,
        room_id: None,
        notes: Some("a".repeat(600)),
    };
    let result = book_appointment(State(state), patient(), Ok(Json(request))).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
}

#[tokio::test]
async fn prescription_ids_must_be_numeric() {
    let state = TestConfig::default().to_state();
    let request = UpdatePrescriptionRequest { status: PrescriptionStatus::Fulfilled };
    let result = update_prescription(State(state), patient(), Path("abc".to_string()), Ok(Json(request))).await;
    assert_matches!(result, Err(AppError::BadRequest(m)) if m == "Invalid prescription id");
}

#[tokio::test]
async fn prescriptions_can_only_be_marked_fulfilled() {
    let state = TestConfig::default().to_state();
    let request = UpdatePrescriptionRequest { status: PrescriptionStatus::Active };
    let result = update_prescription(State(state), patient(), Path("3".to_string()), Ok(Json(request))).await;
    assert_matches!(result, Err(AppError::ValidationError(_)));
}
