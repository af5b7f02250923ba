use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::debug;

use shared_database::AppState;
use shared_models::auth::{Role, SessionUser};
use shared_models::error::AppError;

use crate::signed_cookie::verify_signed_value;

#[derive(Debug, FromRow)]
struct SessionRow {
    session_id: String,
    expires_at: DateTime<Utc>,
    user_id: String,
    name: String,
    email: String,
    role: String,
    email_verified: bool,
    banned: bool,
    ban_expires: Option<DateTime<Utc>>,
}

/// Resolves the session cookie into a `SessionUser` request extension.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let raw = session_cookie(request.headers(), &state.config.session_cookie_name)
        .ok_or_else(AppError::unauthorized)?;

    let token = verify_signed_value(&raw, &state.config.auth_secret).map_err(|e| {
        debug!("Rejecting session cookie: {}", e);
        AppError::unauthorized()
    })?;

    let user = load_session_user(&state, &token).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    jar.get(cookie_name)
        .or_else(|| jar.get(&format!("__Secure-{}", cookie_name)))
        .map(|cookie| cookie.value().to_string())
}

async fn load_session_user(state: &AppState, token: &str) -> Result<SessionUser, AppError> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"SELECT s.id AS session_id, s.expires_at, u.id AS user_id, u.name, u.email, u.role,
                  u.email_verified, u.banned, u.ban_expires
           FROM session s
           JOIN "user" u ON u.id = s.user_id
           WHERE s.token = $1"#,
    )
    .bind(token)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(AppError::unauthorized)?;

    let now = Utc::now();
    if row.expires_at <= now {
        debug!("Session {} expired at {}", row.session_id, row.expires_at);
        return Err(AppError::unauthorized());
    }

    if row.banned && row.ban_expires.map_or(true, |until| until > now) {
        debug!("Banned user {} attempted access", row.user_id);
        return Err(AppError::unauthorized());
    }

    let role = row.role.parse::<Role>().map_err(|_| AppError::forbidden())?;

    Ok(SessionUser {
        id: row.user_id,
        name: row.name,
        email: row.email,
        role,
        email_verified: row.email_verified,
        session_id: row.session_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_plain_and_secure_cookie_names() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; better-auth.session_token=abc.def"),
        );
        assert_eq!(
            session_cookie(&headers, "better-auth.session_token").as_deref(),
            Some("abc.def")
        );

        let mut secure = HeaderMap::new();
        secure.insert(
            "cookie",
            HeaderValue::from_static("__Secure-better-auth.session_token=xyz.sig"),
        );
        assert_eq!(
            session_cookie(&secure, "better-auth.session_token").as_deref(),
            Some("xyz.sig")
        );
    }

    #[test]
    fn missing_cookie_yields_none() {
        assert!(session_cookie(&HeaderMap::new(), "better-auth.session_token").is_none());
    }
}
