use assert_matches::assert_matches;
use axum::{
    body::Body,
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, Request, StatusCode},
    Json,
};
use chrono::{Duration, NaiveDate};
use tower::ServiceExt;

use doctor_cell::handlers::*;
use doctor_cell::models::*;
use doctor_cell::router::doctor_routes;
use shared_models::error::AppError;
use shared_utils::datetime::today_local;
use shared_utils::test_utils::{TestConfig, TestUser};

fn doctor() -> Extension<shared_models::auth::SessionUser> {
    Extension(TestUser::doctor("lekarz@example.com").to_user())
}

fn patient() -> Extension<shared_models::auth::SessionUser> {
    Extension(TestUser::patient("pacjent@example.com").to_user())
}

#[tokio::test]
async fn requests_without_session_cookie_are_unauthorized() {
    let app = doctor_routes(TestConfig::default().to_state());

    for uri in ["/visits", "/dispositions/today", "/stats/visitTypes"] {
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn patients_cannot_read_doctor_appointments() {
    let state = TestConfig::default().to_state();
    let result = get_appointment(State(state), patient(), Path("12".to_string())).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn malformed_appointment_id_is_rejected() {
    let state = TestConfig::default().to_state();
    let result = get_appointment(State(state), doctor(), Path("abc".to_string())).await;
    assert_matches!(result, Err(AppError::BadRequest(m)) if m == "Nieprawidłowy identyfikator wizyty");
}

#[tokio::test]
async fn completing_without_visit_goal_is_rejected() {
    let state = TestConfig::default().to_state();
    let request = CompleteVisitRequest {
        visit_goal: " ".into(),
        symptoms: Some("Ból głowy".into()),
        ..Default::default()
    };

    let result = complete_appointment(State(state), doctor(), Path("7".to_string()), Ok(Json(request))).await;
    assert_matches!(result, Err(AppError::ValidationError(m)) if m == "Cel wizyty jest wymagany");
}

#[tokio::test]
async fn dispositions_in_the_past_are_rejected() {
    let state = TestConfig::default().to_state();
    let yesterday = today_local() - Duration::days(1);
    let request = SaveDispositionsRequest {
        period_start: yesterday,
        period_end: yesterday + Duration::days(6),
        days: vec![DispositionDay { date: yesterday, start_hour: 8, end_hour: 14 }],
    };

    let result = save_dispositions(State(state), doctor(), HeaderMap::new(), Ok(Json(request))).await;
    assert_matches!(result, Err(AppError::ValidationError(m)) if m == "Data nie może być w przeszłości");
}

#[tokio::test]
async fn dispositions_with_reversed_hours_are_rejected() {
    let state = TestConfig::default().to_state();
    let day = today_local() + Duration::days(3);
    let request = SaveDispositionsRequest {
        period_start: day,
        period_end: day,
        days: vec![DispositionDay { date: day, start_hour: 15, end_hour: 9 }],
    };

    let result = save_dispositions(State(state), doctor(), HeaderMap::new(), Ok(Json(request))).await;
    assert_matches!(
        result,
        Err(AppError::ValidationError(m)) if m == "Godzina zakończenia musi być późniejsza niż rozpoczęcia"
    );
}

#[tokio::test]
async fn disposition_range_requires_iso_dates() {
    let state = TestConfig::default().to_state();
    let query = DispositionRangeQuery {
        start_date: Some("07.01.2030".into()),
        end_date: None,
    };

    let result = list_dispositions(State(state), doctor(), Ok(Query(query))).await;
    assert_matches!(result, Err(AppError::ValidationError(m)) if m == "Data musi być w formacie YYYY-MM-DD");
}

#[tokio::test]
async fn patients_cannot_read_visit_statistics() {
    let state = TestConfig::default().to_state();
    let result = list_patients(State(state), patient()).await;
    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[test]
fn past_period_end_is_reported_before_day_checks() {
    let start = NaiveDate::from_ymd_opt(2030, 1, 10).unwrap();
    let request = SaveDispositionsRequest {
        period_start: start,
        period_end: start - Duration::days(1),
        days: vec![DispositionDay { date: start, start_hour: 8, end_hour: 9 }],
    };
    assert_eq!(
        request.check_dates(start),
        Err("Data zakończenia musi być późniejsza lub równa dacie rozpoczęcia")
    );
}
