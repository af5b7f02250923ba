use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use public_cell::router::health_routes;
use shared_utils::test_utils::TestConfig;

#[tokio::test]
async fn health_reports_unavailable_dependencies() {
    let app = health_routes(TestConfig::default().to_state());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["database"]["status"], "unhealthy");
    assert_eq!(json["redis"]["status"], "unhealthy");
    assert!(json["redis"]["errorMessage"].is_string());
}
