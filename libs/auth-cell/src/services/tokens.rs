use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

const VERIFICATION_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

pub fn create_verification_token(secret: &str, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = VerificationClaims {
        email: Some(email.to_string()),
        iat: now.timestamp(),
        exp: (now + Duration::hours(VERIFICATION_TTL_HOURS)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Checks the HS256 signature and expiry.
pub fn decode_verification_token(
    secret: &str,
    token: &str,
) -> Result<VerificationClaims, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<VerificationClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            debug!("Verification token rejected: {}", e);
            e
        })?;
    Ok(data.claims)
}

pub fn verification_link(app_url: &str, token: &str) -> String {
    format!(
        "{}/api/auth/verify-email?token={}",
        app_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

pub fn password_setup_link(app_url: &str, token: &str) -> String {
    format!(
        "{}/change-password?token={}",
        app_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-session-validation-must-be-long";

    #[test]
    fn token_round_trip_carries_email() {
        let token = create_verification_token(SECRET, "jan@example.com").unwrap();
        let claims = decode_verification_token(SECRET, &token).unwrap();
        assert_eq!(claims.email.as_deref(), Some("jan@example.com"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_verification_token(SECRET, "jan@example.com").unwrap();
        assert!(decode_verification_token("other-secret", &token).is_err());
    }

    #[test]
    fn token_without_email_decodes_with_none() {
        let claims = VerificationClaims {
            email: None,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(decode_verification_token(SECRET, &token).unwrap().email.is_none());
    }

    #[test]
    fn links_use_app_url() {
        assert_eq!(
            verification_link("http://localhost:3000/", "abc"),
            "http://localhost:3000/api/auth/verify-email?token=abc"
        );
        assert_eq!(
            password_setup_link("http://localhost:3000", "xyz"),
            "http://localhost:3000/change-password?token=xyz"
        );
    }
}
