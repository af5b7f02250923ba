use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};

use auth_cell::{AccountService, NewAccount, PasswordService};
use shared_config::{AppConfig, DemoAccount};
use shared_models::auth::Role;

const DEFAULT_ADMIN_NAME: &str = "Administrator";
const DEMO_SPECIALIZATIONS: [&str; 3] = ["Pediatria", "Kardiologia", "Dermatologia"];
const DEMO_LICENSE_NUMBER: &str = "DEMO-0001";

/// Startup data fixes: a first admin account and, in demo mode, a fresh demo clinic.
pub async fn run(pool: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    if config.demo_mode {
        seed_demo(&mut tx, config).await.context("Seeding demo data failed")?;
    }
    ensure_admin(&mut tx, &config.default_admin_email)
        .await
        .context("Creating default admin failed")?;

    tx.commit().await?;
    Ok(())
}

/// 16 random bytes, hex encoded.
pub fn generate_admin_password() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

async fn ensure_admin(conn: &mut PgConnection, email: &str) -> anyhow::Result<()> {
    let has_admin: bool = sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM "user" WHERE role = 'admin')"#)
        .fetch_one(&mut *conn)
        .await?;
    if has_admin {
        return Ok(());
    }

    let password = generate_admin_password();
    let account = DemoAccount {
        email: email.to_string(),
        password: password.clone(),
        name: DEFAULT_ADMIN_NAME.to_string(),
    };
    upsert_account(&mut *conn, &account, Role::Admin).await?;

    warn!("No admin account found. Created {} with password: {}", email, password);
    Ok(())
}

async fn seed_demo(conn: &mut PgConnection, config: &AppConfig) -> anyhow::Result<()> {
    info!("Demo mode enabled, resetting clinic data");

    sqlx::query(
        r#"TRUNCATE appointments, availability, test_results, medical_records, medications,
                    prescriptions, recommendations, room_specializations, room, logs,
                    patients, doctors, receptionists, specializations
           RESTART IDENTITY CASCADE"#,
    )
    .execute(&mut *conn)
    .await?;
    sqlx::query(r#"DELETE FROM "user" WHERE role <> 'admin'"#)
        .execute(&mut *conn)
        .await?;

    for name in DEMO_SPECIALIZATIONS {
        sqlx::query("INSERT INTO specializations (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut *conn)
            .await?;
    }

    upsert_account(&mut *conn, &config.demo_admin, Role::Admin).await?;

    let doctor_id = upsert_account(&mut *conn, &config.demo_doctor, Role::Doctor).await?;
    sqlx::query(
        r#"INSERT INTO doctors (user_id, specialization_id, license_number)
           SELECT $1, id, $2 FROM specializations WHERE name = $3
           ON CONFLICT (user_id) DO UPDATE
           SET specialization_id = EXCLUDED.specialization_id, license_number = EXCLUDED.license_number"#,
    )
    .bind(&doctor_id)
    .bind(DEMO_LICENSE_NUMBER)
    .bind(DEMO_SPECIALIZATIONS[0])
    .execute(&mut *conn)
    .await?;

    let receptionist_id =
        upsert_account(&mut *conn, &config.demo_receptionist, Role::Receptionist).await?;
    sqlx::query("INSERT INTO receptionists (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(&receptionist_id)
        .execute(&mut *conn)
        .await?;

    info!(
        "Demo accounts ready: {}, {}, {}",
        config.demo_admin.email, config.demo_doctor.email, config.demo_receptionist.email
    );
    Ok(())
}

/// Creates the account or resets role, name and password of an existing one.
async fn upsert_account(conn: &mut PgConnection, account: &DemoAccount, role: Role) -> anyhow::Result<String> {
    let existing: Option<String> =
        sqlx::query_scalar(r#"SELECT id FROM "user" WHERE lower(email) = lower($1)"#)
            .bind(&account.email)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(user_id) = existing else {
        let user_id = AccountService::create_user(
            &mut *conn,
            &NewAccount {
                name: &account.name,
                email: &account.email,
                role,
                email_verified: true,
                password: &account.password,
            },
        )
        .await?;
        return Ok(user_id);
    };

    let password_hash = PasswordService::hash_password(&account.password)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;

    sqlx::query(
        r#"UPDATE "user"
           SET name = $2, role = $3, email_verified = TRUE, banned = FALSE, ban_reason = NULL, updated_at = now()
           WHERE id = $1"#,
    )
    .bind(&user_id)
    .bind(&account.name)
    .bind(role.as_str())
    .execute(&mut *conn)
    .await?;
    sqlx::query(
        r#"UPDATE account SET password = $2, updated_at = now()
           WHERE user_id = $1 AND provider_id = 'credential'"#,
    )
    .bind(&user_id)
    .bind(&password_hash)
    .execute(&mut *conn)
    .await?;

    info!("Updated existing {} account {}", role, user_id);
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_password_is_sixteen_hex_bytes() {
        let password = generate_admin_password();
        assert_eq!(password.len(), 32);
        assert!(password.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(password, generate_admin_password());
    }
}
