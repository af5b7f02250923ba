use axum::http::HeaderMap;
use sqlx::PgPool;
use tracing::{debug, error};

pub const UNKNOWN_IP: &str = "nieznany";

pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

/// Appends an entry to the `logs` table. Failures never abort the calling request.
pub async fn record_audit_log(pool: &PgPool, headers: &HeaderMap, user_id: Option<&str>, action: &str) {
    let ip = client_ip(headers);

    let result = sqlx::query("INSERT INTO logs (user_id, action, ip_address) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(action)
        .bind(&ip)
        .execute(pool)
        .await;

    match result {
        Ok(_) => debug!("Audit log recorded: {}", action),
        Err(e) => error!("Failed to record audit log '{}': {}", action, e),
    }
}
