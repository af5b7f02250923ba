use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a `token.signature` cookie value and returns the bare session token.
pub fn verify_signed_value(raw: &str, secret: &str) -> Result<String, String> {
    if secret.is_empty() {
        return Err("Session secret is not set".to_string());
    }

    let decoded = urlencoding::decode(raw)
        .map_err(|_| "Invalid cookie encoding".to_string())?;

    let (token, signature_b64) = decoded
        .rsplit_once('.')
        .ok_or_else(|| "Invalid cookie format".to_string())?;

    if token.is_empty() {
        return Err("Invalid cookie format".to_string());
    }

    let signature = STANDARD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode cookie signature: {}", e);
        "Invalid signature encoding".to_string()
    })?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(token.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Session cookie signature verification failed");
        return Err("Invalid cookie signature".to_string());
    }

    Ok(token.to_string())
}

/// Produces the value the session issuer stores in the cookie.
pub fn sign_value(token: &str, secret: &str) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(token.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(urlencoding::encode(&format!("{}.{}", token, signature)).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-for-session-cookies";

    #[test]
    fn accepts_correctly_signed_token() {
        let value = sign_value("abc123", SECRET).unwrap();
        assert_eq!(verify_signed_value(&value, SECRET).unwrap(), "abc123");
    }

    #[test]
    fn rejects_wrong_secret() {
        let value = sign_value("abc123", SECRET).unwrap();
        assert_eq!(
            verify_signed_value(&value, "other-secret").unwrap_err(),
            "Invalid cookie signature"
        );
    }

    #[test]
    fn rejects_unsigned_value() {
        assert!(verify_signed_value("abc123", SECRET).is_err());
    }

    #[test]
    fn rejects_tampered_token() {
        let value = sign_value("abc123", SECRET).unwrap();
        let tampered = value.replacen("abc123", "abc124", 1);
        assert!(verify_signed_value(&tampered, SECRET).is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(verify_signed_value("a.b", "").is_err());
    }
}
