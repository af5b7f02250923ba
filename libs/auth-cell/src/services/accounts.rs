use chrono::{Duration, Utc};
use sqlx::PgConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::Notifier;
use shared_models::auth::Role;
use shared_models::error::AppError;

use crate::models::EMAIL_TAKEN;
use crate::services::password::PasswordService;
use crate::services::tokens::password_setup_link;

const RESET_TOKEN_TTL_HOURS: i64 = 1;
const CREDENTIAL_PROVIDER: &str = "credential";

pub struct NewAccount<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub role: Role,
    pub email_verified: bool,
    pub password: &'a str,
}

pub struct AccountService;

impl AccountService {
    pub async fn email_exists(conn: &mut PgConnection, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM "user" WHERE lower(email) = lower($1))"#)
            .bind(email)
            .fetch_one(conn)
            .await
    }

    /// Inserts the user together with its credential account and returns the new id.
    pub async fn create_user(conn: &mut PgConnection, account: &NewAccount<'_>) -> Result<String, AppError> {
        if Self::email_exists(&mut *conn, account.email).await? {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hash = PasswordService::hash_password(account.password)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
        let user_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"INSERT INTO "user" (id, name, email, email_verified, role)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&user_id)
        .bind(account.name)
        .bind(account.email)
        .bind(account.email_verified)
        .bind(account.role.as_str())
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"INSERT INTO account (id, account_id, provider_id, user_id, password)
               VALUES ($1, $2, $3, $2, $4)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user_id)
        .bind(CREDENTIAL_PROVIDER)
        .bind(&password_hash)
        .execute(&mut *conn)
        .await?;

        info!("Created {} account {}", account.role, user_id);
        Ok(user_id)
    }

    pub async fn set_role(conn: &mut PgConnection, user_id: &str, role: Role) -> Result<(), sqlx::Error> {
        sqlx::query(r#"UPDATE "user" SET role = $2, updated_at = now() WHERE id = $1"#)
            .bind(user_id)
            .bind(role.as_str())
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Stores a one-hour password reset token for the user.
    pub async fn issue_password_reset(conn: &mut PgConnection, user_id: &str) -> Result<String, sqlx::Error> {
        let token = PasswordService::generate_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        sqlx::query(
            r#"INSERT INTO verification (id, identifier, value, expires_at)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(format!("reset-password:{}", token))
        .bind(user_id)
        .bind(expires_at)
        .execute(conn)
        .await?;

        debug!("Issued password reset token for {}", user_id);
        Ok(token)
    }

    /// Creates a staff account with a throwaway password and a reset token.
    pub async fn create_staff_account(
        conn: &mut PgConnection,
        name: &str,
        email: &str,
        role: Role,
    ) -> Result<(String, String), AppError> {
        let password = PasswordService::generate_temporary_password();
        let user_id = Self::create_user(
            &mut *conn,
            &NewAccount {
                name,
                email,
                role,
                email_verified: true,
                password: &password,
            },
        )
        .await?;
        let token = Self::issue_password_reset(&mut *conn, &user_id).await?;
        Ok((user_id, token))
    }

    /// Queues the set-password email; the account already exists, so failures are only logged.
    pub async fn send_password_setup(notifier: &Notifier, app_url: &str, email: &str, name: &str, token: &str) {
        let link = password_setup_link(app_url, token);
        if let Err(e) = notifier.set_password(email, name, &link).await {
            warn!("Failed to queue password setup email for {}: {}", email, e);
        }
    }
}
