use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{debug, info, warn};
use validator::Validate;

use shared_database::AppState;
use shared_models::error::{first_validation_message, AppError};

use crate::models::{
    RegisterRequest, RegisterResponse, VerifyEmailQuery, VerifyEmailResponse,
    REGISTRATION_SUCCESS, REGISTRATION_VALIDATION_FAILED,
};
use crate::services::registration::RegistrationService;
use crate::services::tokens::decode_verification_token;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Patient registered", body = RegisterResponse),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Email or PESEL already registered"),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let payload: RegisterRequest = serde_json::from_slice::<RegisterRequest>(&body)
        .map_err(|e| {
            warn!("PatientRegistrationValidation: {}", e);
            AppError::ValidationError(REGISTRATION_VALIDATION_FAILED.to_string())
        })?
        .normalized();

    if let Err(errors) = payload.validate() {
        warn!(
            "PatientRegistrationValidation: {}",
            first_validation_message(&errors).unwrap_or_default()
        );
        return Err(AppError::ValidationError(REGISTRATION_VALIDATION_FAILED.to_string()));
    }

    debug!("Registering patient {}", payload.email);
    let patient = RegistrationService::register_patient(&state, &headers, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            status: "ok".to_string(),
            patient,
            message: REGISTRATION_SUCCESS.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/verify-email",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified", body = VerifyEmailResponse),
        (status = 400, description = "Missing or malformed token"),
        (status = 401, description = "Token signature or expiry rejected"),
        (status = 404, description = "Unknown user"),
        (status = 409, description = "Email already verified"),
    ),
    tag = "auth"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<VerifyEmailResponse>, AppError> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Brak tokenu weryfikacyjnego".to_string()))?;

    let claims = decode_verification_token(&state.config.auth_secret, &token)
        .map_err(|_| AppError::Auth("Nie udało się zweryfikować tokenu.".to_string()))?;

    let email = claims
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Nieprawidłowy token.".to_string()))?;

    let verified: Option<bool> =
        sqlx::query_scalar(r#"SELECT email_verified FROM "user" WHERE email = $1"#)
            .bind(&email)
            .fetch_optional(&state.db)
            .await?;

    match verified {
        None => return Err(AppError::NotFound("Użytkownik nie istnieje.".to_string())),
        Some(true) => {
            return Err(AppError::Conflict(
                "Adres e-mail jest już zweryfikowany.".to_string(),
            ))
        }
        Some(false) => {}
    }

    sqlx::query(r#"UPDATE "user" SET email_verified = TRUE, updated_at = now() WHERE email = $1"#)
        .bind(&email)
        .execute(&state.db)
        .await
        .map_err(|e| {
            warn!("Email verification update failed for {}: {}", email, e);
            AppError::BadRequest("Nie udało się zweryfikować adresu e-mail.".to_string())
        })?;

    info!("Email verified for {}", email);
    Ok(Json(VerifyEmailResponse {
        status: "ok".to_string(),
        email_verified: true,
    }))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use shared_utils::test_utils::TestConfig;

    use crate::router::auth_routes;

    async fn error_message(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["error"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn register_rejects_invalid_payload_with_generic_message() {
        let app = auth_routes(TestConfig::default().to_state());
        let response = app
            .oneshot(
                Request::post("/register")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"email":"nope","name":"J"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(error_message(response).await, "Błąd walidacji danych rejestracji.");
    }

    #[tokio::test]
    async fn verify_email_requires_token() {
        let app = auth_routes(TestConfig::default().to_state());
        let response = app
            .oneshot(Request::get("/verify-email").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(error_message(response).await, "Brak tokenu weryfikacyjnego");
    }

    #[tokio::test]
    async fn verify_email_rejects_forged_token() {
        let app = auth_routes(TestConfig::default().to_state());
        let token = crate::services::tokens::create_verification_token("other-secret", "jan@example.com").unwrap();
        let response = app
            .oneshot(
                Request::get(format!("/verify-email?token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), 401);
        assert_eq!(error_message(response).await, "Nie udało się zweryfikować tokenu.");
    }
}
