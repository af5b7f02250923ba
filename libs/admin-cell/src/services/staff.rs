use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};

use appointment_cell::AppointmentStatus;
use auth_cell::AccountService;
use notification_cell::{AppointmentEmail, Notifier, SUBJECT_CANCELED_DOCTOR_REMOVED};
use shared_models::auth::Role;
use shared_utils::datetime::format_pl_datetime;
use shared_utils::names::{build_person_name, DEFAULT_DOCTOR_NAME, DEFAULT_PATIENT_NAME};

use crate::models::{
    admin_renamed_audit, AdminAccount, AdminError, Change, CreateAdminRequest, CreateDoctorRequest,
    CreateReceptionistRequest, DoctorAccount, OrphanedVisit, ReceptionistAccount,
    UpdateAdminRequest, UpdateDoctorRequest, DOCTOR_BAN_REASON,
};

const DOCTOR_SELECT: &str = r#"SELECT d.user_id, u.name AS user_name, u.email AS user_email,
                                      d.specialization_id, s.name AS specialization_name, d.license_number
                               FROM doctors d
                               LEFT JOIN "user" u ON u.id = d.user_id
                               LEFT JOIN specializations s ON s.id = d.specialization_id"#;

/// Where password-setup links point and how they are delivered.
pub struct Invitation<'a> {
    pub notifier: &'a Notifier,
    pub app_url: &'a str,
}

impl Invitation<'_> {
    async fn send(&self, email: &str, name: &str, token: &str) {
        AccountService::send_password_setup(self.notifier, self.app_url, email, name, token).await;
    }
}

pub struct StaffService;

impl StaffService {
    // ==========================================================================
    // ADMINS
    // ==========================================================================

    pub async fn list_admins(pool: &PgPool) -> Result<Vec<AdminAccount>, AdminError> {
        let admins = sqlx::query_as::<_, AdminAccount>(
            r#"SELECT id, name, email, created_at FROM "user"
               WHERE role = 'admin'
               ORDER BY name ASC"#,
        )
        .fetch_all(pool)
        .await?;
        Ok(admins)
    }

    async fn find_admin(conn: &mut PgConnection, id: &str) -> Result<AdminAccount, AdminError> {
        sqlx::query_as::<_, AdminAccount>(
            r#"SELECT id, name, email, created_at FROM "user"
               WHERE id = $1 AND role = 'admin'"#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(AdminError::AdminNotFound)
    }

    pub async fn create_admin(
        pool: &PgPool,
        invitation: &Invitation<'_>,
        request: &CreateAdminRequest,
    ) -> Result<AdminAccount, AdminError> {
        let (name, email) = (request.name.trim(), request.email.trim());
        let mut tx = pool.begin().await?;
        let (user_id, token) = AccountService::create_staff_account(&mut tx, name, email, Role::Admin).await?;
        let admin = Self::find_admin(&mut tx, &user_id).await?;
        tx.commit().await?;

        invitation.send(email, name, &token).await;
        info!("Created administrator {}", user_id);
        Ok(admin)
    }

    pub async fn rename_admin(
        pool: &PgPool,
        id: &str,
        request: &UpdateAdminRequest,
    ) -> Result<Change<AdminAccount>, AdminError> {
        let mut conn = pool.acquire().await?;
        let current = Self::find_admin(&mut conn, id).await?;

        let Some(name) = request.name.as_deref().map(str::trim) else {
            return Ok(Change::Unchanged);
        };
        if name == current.name {
            return Ok(Change::Unchanged);
        }

        let admin = sqlx::query_as::<_, AdminAccount>(
            r#"UPDATE "user" SET name = $2, updated_at = now()
               WHERE id = $1
               RETURNING id, name, email, created_at"#,
        )
        .bind(id)
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Change::Applied {
            audit: admin_renamed_audit(&current.name, &admin.name),
            value: admin,
        })
    }

    /// Demotes an administrator to a regular user. Returns the demoted name.
    /// An admin can never remove themselves, and the last admin always stays.
    pub async fn delete_admin(pool: &PgPool, actor_id: &str, id: &str) -> Result<String, AdminError> {
        if actor_id == id {
            return Err(AdminError::SelfDelete);
        }

        let mut tx = pool.begin().await?;
        let admin_ids: Vec<String> = sqlx::query_scalar(
            r#"SELECT id FROM "user" WHERE role = 'admin' ORDER BY id FOR UPDATE"#,
        )
        .fetch_all(&mut *tx)
        .await?;

        if admin_ids.len() <= 1 {
            return Err(AdminError::LastAdmin);
        }
        if !admin_ids.iter().any(|admin_id| admin_id == id) {
            return Err(AdminError::AdminNotFound);
        }

        let admin = Self::find_admin(&mut tx, id).await?;
        AccountService::set_role(&mut tx, id, Role::User).await?;
        tx.commit().await?;

        info!("Administrator {} demoted to user", id);
        Ok(admin.name)
    }

    // ==========================================================================
    // DOCTORS
    // ==========================================================================

    pub async fn list_doctors(pool: &PgPool) -> Result<Vec<DoctorAccount>, AdminError> {
        let doctors = sqlx::query_as::<_, DoctorAccount>(&format!(
            "{} WHERE u.banned = FALSE ORDER BY u.name ASC",
            DOCTOR_SELECT
        ))
        .fetch_all(pool)
        .await?;
        Ok(doctors)
    }

    async fn find_doctor(conn: &mut PgConnection, id: &str) -> Result<DoctorAccount, AdminError> {
        sqlx::query_as::<_, DoctorAccount>(&format!("{} WHERE d.user_id = $1", DOCTOR_SELECT))
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or(AdminError::DoctorNotFound)
    }

    async fn ensure_specialization(conn: &mut PgConnection, id: i32) -> Result<(), AdminError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM specializations WHERE id = $1)")
            .bind(id)
            .fetch_one(conn)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(AdminError::SpecializationNotFound)
        }
    }

    pub async fn create_doctor(
        pool: &PgPool,
        invitation: &Invitation<'_>,
        request: &CreateDoctorRequest,
    ) -> Result<DoctorAccount, AdminError> {
        let (name, email) = (request.name.trim(), request.email.trim());
        let license_number = request.license_number.trim();

        let mut tx = pool.begin().await?;
        if let Some(specialization_id) = request.specialization_id {
            Self::ensure_specialization(&mut tx, specialization_id).await?;
        }

        let (user_id, token) = AccountService::create_staff_account(&mut tx, name, email, Role::Doctor).await?;
        sqlx::query("INSERT INTO doctors (user_id, specialization_id, license_number) VALUES ($1, $2, $3)")
            .bind(&user_id)
            .bind(request.specialization_id)
            .bind(license_number)
            .execute(&mut *tx)
            .await
            .map_err(|e| AdminError::unique_or(e, AdminError::LicenseTaken))?;

        let doctor = Self::find_doctor(&mut tx, &user_id).await?;
        tx.commit().await?;

        invitation.send(email, name, &token).await;
        info!("Created doctor {} with license {}", user_id, license_number);
        Ok(doctor)
    }

    pub async fn update_doctor(
        pool: &PgPool,
        id: &str,
        request: &UpdateDoctorRequest,
    ) -> Result<Change<DoctorAccount>, AdminError> {
        let mut conn = pool.acquire().await?;
        let current = Self::find_doctor(&mut conn, id).await?;

        if let Some(Some(specialization_id)) = request.specialization_id {
            Self::ensure_specialization(&mut conn, specialization_id).await?;
        }

        let mut changes = Vec::new();
        let specialization = request
            .specialization_id
            .filter(|next| *next != current.specialization_id);
        if specialization.is_some() {
            changes.push("zmieniono specjalizację".to_string());
        }

        let license = request
            .license_number
            .as_deref()
            .map(str::trim)
            .filter(|next| current.license_number.as_deref() != Some(*next));
        if let Some(license) = license {
            changes.push(format!("zmieniono numer licencji na \"{}\"", license));
        }

        if changes.is_empty() {
            return Ok(Change::Unchanged);
        }

        sqlx::query(
            r#"UPDATE doctors
               SET specialization_id = CASE WHEN $2 THEN $3 ELSE specialization_id END,
                   license_number = COALESCE($4, license_number)
               WHERE user_id = $1"#,
        )
        .bind(id)
        .bind(specialization.is_some())
        .bind(specialization.flatten())
        .bind(license)
        .execute(&mut *conn)
        .await
        .map_err(|e| AdminError::unique_or(e, AdminError::LicenseTaken))?;

        let doctor = Self::find_doctor(&mut conn, id).await?;
        let audit = format!(
            "Zaktualizowano lekarza \"{}\": {}",
            current.user_name.as_deref().unwrap_or(DEFAULT_DOCTOR_NAME),
            changes.join(", ")
        );
        Ok(Change::Applied { value: doctor, audit })
    }

    /// Cancels the doctor's open visits and bans the account in one transaction,
    /// then notifies every affected patient. Returns the doctor's name.
    pub async fn delete_doctor(pool: &PgPool, notifier: &Notifier, id: &str) -> Result<String, AdminError> {
        let mut tx = pool.begin().await?;
        let doctor = Self::find_doctor(&mut tx, id).await?;

        let visits = sqlx::query_as::<_, OrphanedVisit>(
            r#"SELECT u.name AS patient_name, u.email AS patient_email,
                      a.datetime, a.is_online, a.type AS kind
               FROM appointments a
               LEFT JOIN "user" u ON u.id = a.patient_id
               WHERE a.doctor_id = $1 AND a.status IN ('scheduled', 'checked_in')
               FOR UPDATE OF a"#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            r#"UPDATE appointments SET status = $2
               WHERE doctor_id = $1 AND status IN ('scheduled', 'checked_in')"#,
        )
        .bind(id)
        .bind(AppointmentStatus::Canceled)
        .execute(&mut *tx)
        .await?;

        sqlx::query(r#"UPDATE "user" SET banned = TRUE, ban_reason = $2, updated_at = now() WHERE id = $1"#)
            .bind(id)
            .bind(DOCTOR_BAN_REASON)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let doctor_name = build_person_name(None, None, doctor.user_name.as_deref(), DEFAULT_DOCTOR_NAME);
        info!("Doctor {} disabled, {} visits canceled", id, visits.len());

        for visit in &visits {
            let Some(email) = visit.patient_email.as_deref() else {
                debug!("Skipping cancellation notice for a visit without patient email");
                continue;
            };
            let data = AppointmentEmail::new(
                build_person_name(None, None, visit.patient_name.as_deref(), DEFAULT_PATIENT_NAME),
                doctor_name.clone(),
                format_pl_datetime(visit.datetime),
                visit.is_online,
                visit.kind,
            );
            if let Err(e) = notifier
                .appointment_canceled(email, SUBJECT_CANCELED_DOCTOR_REMOVED, &data)
                .await
            {
                warn!("Cancellation notice to {} not queued: {}", email, e);
            }
        }

        Ok(doctor_name)
    }

    // ==========================================================================
    // RECEPTIONISTS
    // ==========================================================================

    pub async fn list_receptionists(pool: &PgPool) -> Result<Vec<ReceptionistAccount>, AdminError> {
        let rows = sqlx::query_as::<_, ReceptionistAccount>(
            r#"SELECT r.user_id, u.name AS user_name, u.email AS user_email
               FROM receptionists r
               LEFT JOIN "user" u ON u.id = r.user_id
               ORDER BY u.name ASC"#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_receptionist(pool: &PgPool, id: &str) -> Result<ReceptionistAccount, AdminError> {
        let mut conn = pool.acquire().await?;
        Self::find_receptionist(&mut conn, id).await
    }

    async fn find_receptionist(conn: &mut PgConnection, id: &str) -> Result<ReceptionistAccount, AdminError> {
        sqlx::query_as::<_, ReceptionistAccount>(
            r#"SELECT r.user_id, u.name AS user_name, u.email AS user_email
               FROM receptionists r
               LEFT JOIN "user" u ON u.id = r.user_id
               WHERE r.user_id = $1"#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(AdminError::ReceptionistNotFound)
    }

    pub async fn create_receptionist(
        pool: &PgPool,
        invitation: &Invitation<'_>,
        request: &CreateReceptionistRequest,
    ) -> Result<ReceptionistAccount, AdminError> {
        let (name, email) = (request.name.trim(), request.email.trim());
        let mut tx = pool.begin().await?;
        let (user_id, token) =
            AccountService::create_staff_account(&mut tx, name, email, Role::Receptionist).await?;

        sqlx::query("INSERT INTO receptionists (user_id) VALUES ($1)")
            .bind(&user_id)
            .execute(&mut *tx)
            .await?;

        let receptionist = Self::find_receptionist(&mut tx, &user_id).await?;
        tx.commit().await?;

        invitation.send(email, name, &token).await;
        info!("Created receptionist {}", user_id);
        Ok(receptionist)
    }

    /// Removes the receptionist profile and demotes the account. Returns the name.
    pub async fn delete_receptionist(pool: &PgPool, id: &str) -> Result<String, AdminError> {
        let mut tx = pool.begin().await?;
        let receptionist = Self::find_receptionist(&mut tx, id).await?;

        sqlx::query("DELETE FROM receptionists WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        AccountService::set_role(&mut tx, id, Role::User).await?;
        tx.commit().await?;

        info!("Receptionist {} removed", id);
        Ok(receptionist.user_name.unwrap_or_default())
    }
}
