use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use przychodnia_api::create_router;
use shared_utils::test_utils::TestConfig;

async fn get(uri: &str) -> (StatusCode, String) {
    let app = create_router(TestConfig::default().to_state());
    let response = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn root_reports_the_service_is_up() {
    let (status, body) = get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Przychodnia API is running!");
}

#[tokio::test]
async fn openapi_document_lists_every_area() {
    let (status, body) = get("/api/openapi.json").await;
    assert_eq!(status, StatusCode::OK);

    let doc: serde_json::Value = serde_json::from_str(&body).unwrap();
    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/api/auth/register",
        "/api/admin/rooms/{id}",
        "/api/doctor/visits/today",
        "/api/patient/appointments",
        "/api/receptionist/visits/checkin",
        "/api/public/landing",
        "/health",
    ] {
        assert!(paths.contains_key(path), "missing {}", path);
    }
}

#[tokio::test]
async fn role_areas_require_a_session() {
    for uri in [
        "/api/admin/statistics",
        "/api/doctor/visits/today",
        "/api/patient/dashboard",
        "/api/receptionist/visits/today",
    ] {
        let (status, _) = get(uri).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (status, _) = get("/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
