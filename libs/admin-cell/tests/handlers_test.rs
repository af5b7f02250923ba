use assert_matches::assert_matches;
use axum::{
    body::Body,
    extract::{Extension, Path, State},
    http::{HeaderMap, Request, StatusCode},
    Json,
};
use tower::ServiceExt;

use admin_cell::handlers::*;
use admin_cell::models::*;
use admin_cell::router::admin_routes;
use shared_models::auth::SessionUser;
use shared_models::error::AppError;
use shared_utils::test_utils::{TestConfig, TestUser};

fn admin() -> Extension<SessionUser> {
    Extension(TestUser::admin("admin@example.com").to_user())
}

#[tokio::test]
async fn admin_routes_require_a_session() {
    let app = admin_routes(TestConfig::default().to_state());
    let response = app
        .oneshot(Request::get("/statistics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn receptionists_cannot_manage_rooms() {
    let state = TestConfig::default().to_state();
    let receptionist = Extension(TestUser::receptionist("recepcja@example.com").to_user());
    let request = CreateRoomRequest { number: 12, specializations: vec![] };

    let result = create_room(State(state), receptionist, HeaderMap::new(), Ok(Json(request))).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn doctors_cannot_read_audit_logs() {
    let state = TestConfig::default().to_state();
    let doctor = Extension(TestUser::doctor("lekarz@example.com").to_user());
    assert_matches!(list_logs(State(state), doctor).await, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let state = TestConfig::default().to_state();
    let user = TestUser::admin("admin@example.com").to_user();
    let own_id = user.id.clone();

    let result = delete_admin(State(state), Extension(user), HeaderMap::new(), Path(own_id)).await;
    assert_matches!(
        result,
        Err(AppError::Forbidden(m)) if m == "Nie możesz usunąć własnego konta administratora."
    );
}

#[tokio::test]
async fn new_admin_needs_a_real_name() {
    let state = TestConfig::default().to_state();
    let request = CreateAdminRequest {
        email: "nowy@example.com".to_string(),
        name: " J ".to_string(),
    };

    let result = create_admin(State(state), admin(), HeaderMap::new(), Ok(Json(request))).await;
    assert_matches!(
        result,
        Err(AppError::ValidationError(m)) if m == "Imię i nazwisko musi zawierać co najmniej 2 znaki."
    );
}

#[tokio::test]
async fn doctor_license_must_be_long_enough() {
    let state = TestConfig::default().to_state();
    let request = CreateDoctorRequest {
        email: "lekarz@example.com".to_string(),
        name: "Jan Kowalski".to_string(),
        specialization_id: Some(1),
        license_number: "12".to_string(),
    };

    let result = create_doctor(State(state), admin(), HeaderMap::new(), Ok(Json(request))).await;
    assert_matches!(
        result,
        Err(AppError::ValidationError(m)) if m == "Numer licencji musi zawierać co najmniej 3 znaki."
    );
}

#[tokio::test]
async fn room_numbers_are_bounded() {
    let state = TestConfig::default().to_state();
    let request = CreateRoomRequest { number: 0, specializations: vec![1] };

    let result = create_room(State(state), admin(), HeaderMap::new(), Ok(Json(request))).await;
    assert_matches!(
        result,
        Err(AppError::ValidationError(m)) if m == "Numer gabinetu musi być liczbą od 1 do 9999."
    );
}

#[tokio::test]
async fn malformed_room_id_is_rejected() {
    let state = TestConfig::default().to_state();
    let result = get_room(State(state), admin(), Path("gabinet".to_string())).await;
    assert_matches!(
        result,
        Err(AppError::BadRequest(m)) if m == "Identyfikator gabinetu jest wymagany."
    );
}

#[tokio::test]
async fn malformed_specialization_id_is_rejected() {
    let state = TestConfig::default().to_state();
    let result = delete_specialization(State(state), admin(), HeaderMap::new(), Path("-4".to_string())).await;
    assert_matches!(
        result,
        Err(AppError::BadRequest(m)) if m == "Identyfikator specjalizacji jest wymagany."
    );
}

#[tokio::test]
async fn specialization_names_are_limited() {
    let state = TestConfig::default().to_state();
    let request = CreateSpecializationRequest { name: "x".repeat(121) };

    let result = create_specialization(State(state), admin(), HeaderMap::new(), Ok(Json(request))).await;
    assert_matches!(
        result,
        Err(AppError::ValidationError(m)) if m == "Nazwa specjalizacji może mieć maksymalnie 120 znaków."
    );
}

#[tokio::test]
async fn empty_room_update_is_rejected() {
    let state = TestConfig::default().to_state();
    let request = UpdateRoomRequest { number: None, specializations: None };

    let result = update_room(State(state), admin(), HeaderMap::new(), Path("3".to_string()), Ok(Json(request))).await;
    assert_matches!(result, Err(AppError::ValidationError(m)) if m == "Brak danych do aktualizacji.");
}
