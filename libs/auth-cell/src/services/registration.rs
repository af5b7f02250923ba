use axum::http::HeaderMap;
use tracing::{error, info, warn};

use notification_cell::Notifier;
use shared_database::AppState;
use shared_models::auth::Role;
use shared_models::db_error::map_db_error;
use shared_models::error::AppError;
use shared_utils::audit::record_audit_log;
use shared_utils::pesel::{birth_date_from_pesel, encrypt_pesel, pesel_hmac, PeselError};

use crate::models::{
    RegisterRequest, RegisteredPatient, PESEL_TAKEN, REGISTRATION_VALIDATION_FAILED,
};
use crate::services::accounts::{AccountService, NewAccount};
use crate::services::tokens::{create_verification_token, verification_link};

pub struct RegistrationService;

impl RegistrationService {
    /// Creates the user, credential account and patient profile in one transaction,
    /// then queues the verification email.
    pub async fn register_patient(
        state: &AppState,
        headers: &HeaderMap,
        payload: &RegisterRequest,
    ) -> Result<RegisteredPatient, AppError> {
        let config = &state.config;

        let date_of_birth = birth_date_from_pesel(&payload.pesel).map_err(|e| {
            warn!("Registration rejected, PESEL birth date: {}", e);
            AppError::ValidationError(REGISTRATION_VALIDATION_FAILED.to_string())
        })?;
        let lookup = pesel_hmac(&config.pesel_hmac_key, &payload.pesel).map_err(pesel_config_error)?;
        let encrypted = encrypt_pesel(&config.pesel_enc_key, &payload.pesel).map_err(pesel_config_error)?;

        let mut tx = state.db.begin().await?;

        let pesel_taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM patients WHERE pesel_hmac = $1)")
                .bind(&lookup)
                .fetch_one(&mut *tx)
                .await?;
        if pesel_taken {
            return Err(AppError::Conflict(PESEL_TAKEN.to_string()));
        }

        let full_name = payload.full_name();
        let user_id = AccountService::create_user(
            &mut tx,
            &NewAccount {
                name: &full_name,
                email: &payload.email,
                role: Role::User,
                email_verified: false,
                password: &payload.password,
            },
        )
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => e,
            other => {
                error!("PatientRegistration for {} failed: {}", payload.email, other);
                AppError::Internal("Błąd tworzenia konta użytkownika.".to_string())
            }
        })?;

        let patient = sqlx::query_as::<_, RegisteredPatient>(
            r#"WITH inserted AS (
                   INSERT INTO patients (user_id, first_name, last_name, pesel, pesel_hmac,
                                         date_of_birth, phone, address)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                   RETURNING user_id, first_name, last_name, phone, address
               )
               SELECT i.user_id, i.first_name, i.last_name, i.phone, i.address,
                      u.email, u.created_at
               FROM inserted i
               LEFT JOIN "user" u ON u.id = i.user_id"#,
        )
        .bind(&user_id)
        .bind(&payload.name)
        .bind(&payload.surname)
        .bind(&encrypted)
        .bind(&lookup)
        .bind(date_of_birth)
        .bind(&payload.phone)
        .bind(&payload.address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| patient_insert_error(&payload.email, e))?;

        tx.commit().await?;
        info!("Registered patient {}", user_id);

        send_verification(state, &payload.email, &full_name).await;

        record_audit_log(
            &state.db,
            headers,
            Some(&user_id),
            "Zarejestrowano nowe konto pacjenta i wysłano link weryfikacyjny.",
        )
        .await;

        Ok(patient)
    }
}

async fn send_verification(state: &AppState, email: &str, name: &str) {
    let token = match create_verification_token(&state.config.auth_secret, email) {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to sign verification token for {}: {}", email, e);
            return;
        }
    };

    let link = verification_link(&state.config.app_url, &token);
    let notifier = Notifier::new(state.email_queue.clone());
    if let Err(e) = notifier.verify_email(email, name, &link).await {
        warn!("Failed to queue verification email for {}: {}", email, e);
    }
}

/// A concurrent registration with the same PESEL passes the `EXISTS` check and
/// trips the `pesel_hmac` unique index instead.
fn patient_insert_error(email: &str, err: sqlx::Error) -> AppError {
    if map_db_error(&err).code.as_deref() == Some("23505") {
        warn!("Registration for {} lost a PESEL race", email);
        return AppError::Conflict(PESEL_TAKEN.to_string());
    }
    error!("PatientProfileCreation for {} failed: {}", email, err);
    AppError::Internal("Błąd tworzenia profilu pacjenta.".to_string())
}

fn pesel_config_error(err: PeselError) -> AppError {
    error!("PESEL protection is misconfigured: {}", err);
    AppError::Internal("Brak konfiguracji serwera".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    #[test]
    fn other_insert_failures_stay_internal() {
        let err = patient_insert_error("jan@example.com", sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Internal(m) if m == "Błąd tworzenia profilu pacjenta."));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn duplicate_pesel_insert_reports_a_conflict() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = PgPool::connect(&url).await.unwrap();
        let lookup = uuid::Uuid::new_v4().to_string();

        let mut results = Vec::new();
        for _ in 0..2 {
            let user_id = uuid::Uuid::new_v4().to_string();
            sqlx::query(r#"INSERT INTO "user" (id, name, email, role) VALUES ($1, 'Test', $2, 'user')"#)
                .bind(&user_id)
                .bind(format!("{}@example.com", user_id))
                .execute(&pool)
                .await
                .unwrap();
            let inserted = sqlx::query(
                "INSERT INTO patients (user_id, pesel, pesel_hmac, address) VALUES ($1, 'enc', $2, 'Warszawa')",
            )
            .bind(&user_id)
            .bind(&lookup)
            .execute(&pool)
            .await;
            results.push(inserted);
        }

        assert!(results[0].is_ok());
        let err = results.pop().unwrap().unwrap_err();
        let mapped = patient_insert_error("jan@example.com", err);
        assert!(matches!(mapped, AppError::Conflict(m) if m == PESEL_TAKEN));
    }
}
