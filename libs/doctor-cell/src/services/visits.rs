use chrono::{NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use appointment_cell::{
    AppointmentStatus, PrescriptionStatus, ACCESS_DENIED, APPOINTMENT_NOT_FOUND,
};
use shared_models::error::AppError;
use shared_utils::datetime::{day_range_utc, today_local, today_range};

use crate::models::{
    AppointmentDetailRow, CompleteVisitRequest, CompleteVisitResponse, DoctorAppointmentDetail,
    DoctorPatient, DoctorVisit, VisitRow, VisitTypeCounts, WeeklyCount,
    DOCTOR_PROFILE_NOT_FOUND, EXAM_CODE_TEST_TYPE, NOT_CHECKED_IN,
};

const VISIT_COLUMNS: &str = r#"
    SELECT a.appointment_id, a.datetime, a.status, a.notes, a.patient_id,
           p.first_name, p.last_name, u.name AS account_name, u.email AS patient_email,
           r.room_id, r.number AS room_number
    FROM appointments a
    LEFT JOIN patients p ON p.user_id = a.patient_id
    LEFT JOIN "user" u ON u.id = a.patient_id
    LEFT JOIN room r ON r.room_id = a.room_room_id"#;

pub struct DoctorVisitService;

impl DoctorVisitService {
    pub async fn ensure_doctor_profile(pool: &PgPool, doctor_id: &str) -> Result<(), AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM doctors WHERE user_id = $1)")
            .bind(doctor_id)
            .fetch_one(pool)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound(DOCTOR_PROFILE_NOT_FOUND.to_string()))
        }
    }

    async fn load_detail(
        conn: &mut PgConnection,
        appointment_id: i32,
    ) -> Result<Option<AppointmentDetailRow>, sqlx::Error> {
        sqlx::query_as::<_, AppointmentDetailRow>(
            r#"SELECT a.appointment_id, a.doctor_id, a.datetime, a.status, a.type AS kind,
                      a.is_online, a.notes, a.patient_id,
                      p.first_name, p.last_name, u.name AS account_name,
                      u.email AS patient_email, p.phone AS patient_phone,
                      r.room_id, r.number AS room_number,
                      rec.content AS recommendation,
                      (SELECT array_agg(m.description ORDER BY m.medication_id)
                         FROM medications m
                        WHERE m.prescription_id = a.prescription_id) AS medications
               FROM appointments a
               LEFT JOIN patients p ON p.user_id = a.patient_id
               LEFT JOIN "user" u ON u.id = a.patient_id
               LEFT JOIN room r ON r.room_id = a.room_room_id
               LEFT JOIN recommendations rec ON rec.recommendation_id = a.recommendation_id
               WHERE a.appointment_id = $1"#,
        )
        .bind(appointment_id)
        .fetch_optional(conn)
        .await
    }

    /// The appointment with patient contact details; only the assigned doctor may read it.
    pub async fn appointment_detail(
        pool: &PgPool,
        doctor_id: &str,
        appointment_id: i32,
    ) -> Result<DoctorAppointmentDetail, AppError> {
        let mut conn = pool.acquire().await?;
        let row = Self::load_detail(&mut conn, appointment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(APPOINTMENT_NOT_FOUND.to_string()))?;

        if row.doctor_id != doctor_id {
            return Err(AppError::Forbidden(ACCESS_DENIED.to_string()));
        }

        Ok(row.into())
    }

    /// Writes the recommendation, prescription, exam codes and closes the visit in one transaction.
    pub async fn complete_visit(
        pool: &PgPool,
        doctor_id: &str,
        appointment_id: i32,
        request: &CompleteVisitRequest,
    ) -> Result<CompleteVisitResponse, AppError> {
        let mut tx = pool.begin().await?;

        let current: Option<(String, String, AppointmentStatus)> = sqlx::query_as(
            "SELECT doctor_id, patient_id, status FROM appointments WHERE appointment_id = $1 FOR UPDATE",
        )
        .bind(appointment_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (owner, patient_id, status) =
            current.ok_or_else(|| AppError::NotFound(APPOINTMENT_NOT_FOUND.to_string()))?;
        if owner != doctor_id {
            return Err(AppError::Forbidden(ACCESS_DENIED.to_string()));
        }
        if status != AppointmentStatus::CheckedIn {
            return Err(AppError::BadRequest(NOT_CHECKED_IN.to_string()));
        }

        let recommendation_id = match request.recommendation() {
            Some(content) => Some(
                sqlx::query_scalar::<_, i32>(
                    "INSERT INTO recommendations (content) VALUES ($1) RETURNING recommendation_id",
                )
                .bind(content)
                .fetch_one(&mut *tx)
                .await?,
            ),
            None => None,
        };

        let medications = request.medications();
        let prescription_id = if medications.is_empty() {
            None
        } else {
            Some(Self::insert_prescription(&mut tx, &medications).await?)
        };

        let completed: Option<AppointmentStatus> = sqlx::query_scalar(
            r#"UPDATE appointments
               SET status = $3, notes = $4, recommendation_id = $5, prescription_id = $6
               WHERE appointment_id = $1 AND doctor_id = $2
               RETURNING status"#,
        )
        .bind(appointment_id)
        .bind(doctor_id)
        .bind(AppointmentStatus::Completed)
        .bind(request.compose_notes())
        .bind(recommendation_id)
        .bind(prescription_id)
        .fetch_optional(&mut *tx)
        .await?;
        let status =
            completed.ok_or_else(|| AppError::NotFound(APPOINTMENT_NOT_FOUND.to_string()))?;

        let codes = request.exam_codes();
        if !codes.is_empty() {
            Self::record_exam_codes(&mut tx, &patient_id, &codes, today_local()).await?;
        }

        tx.commit().await?;
        info!(
            "Doctor {} completed appointment {} ({} medications, {} exam codes)",
            doctor_id,
            appointment_id,
            medications.len(),
            codes.len()
        );

        Ok(CompleteVisitResponse {
            appointment_id,
            status,
            recommendation_id,
            prescription_id,
        })
    }

    async fn insert_prescription(conn: &mut PgConnection, medications: &[String]) -> Result<i32, sqlx::Error> {
        let prescription_id: i32 = sqlx::query_scalar(
            "INSERT INTO prescriptions (issued_at, status) VALUES ($1, $2) RETURNING prescription_id",
        )
        .bind(Utc::now())
        .bind(PrescriptionStatus::Active)
        .fetch_one(&mut *conn)
        .await?;

        for description in medications {
            sqlx::query("INSERT INTO medications (prescription_id, description) VALUES ($1, $2)")
                .bind(prescription_id)
                .bind(description)
                .execute(&mut *conn)
                .await?;
        }

        Ok(prescription_id)
    }

    async fn record_exam_codes(
        conn: &mut PgConnection,
        patient_id: &str,
        codes: &[String],
        test_date: NaiveDate,
    ) -> Result<(), sqlx::Error> {
        let record_id: i32 = sqlx::query_scalar(
            r#"INSERT INTO medical_records (patient_id) VALUES ($1)
               ON CONFLICT (patient_id) DO UPDATE SET patient_id = EXCLUDED.patient_id
               RETURNING record_id"#,
        )
        .bind(patient_id)
        .fetch_one(&mut *conn)
        .await?;

        for code in codes {
            sqlx::query(
                "INSERT INTO test_results (record_id, test_type, result, test_date) VALUES ($1, $2, $3, $4)",
            )
            .bind(record_id)
            .bind(EXAM_CODE_TEST_TYPE)
            .bind(code)
            .bind(test_date)
            .execute(&mut *conn)
            .await?;
        }

        debug!("Stored {} exam codes in record {}", codes.len(), record_id);
        Ok(())
    }

    /// Non-canceled visits, ascending within a single day, newest first otherwise.
    pub async fn visits(pool: &PgPool, doctor_id: &str, date: Option<NaiveDate>) -> Result<Vec<DoctorVisit>, AppError> {
        let rows = match date {
            Some(day) => {
                let (start, end) = day_range_utc(day)
                    .ok_or_else(|| AppError::BadRequest("Nieprawidłowa data".to_string()))?;
                sqlx::query_as::<_, VisitRow>(&format!(
                    "{} WHERE a.doctor_id = $1 AND a.status <> 'canceled'
                       AND a.datetime >= $2 AND a.datetime < $3
                     ORDER BY a.datetime ASC",
                    VISIT_COLUMNS
                ))
                .bind(doctor_id)
                .bind(start)
                .bind(end)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, VisitRow>(&format!(
                    "{} WHERE a.doctor_id = $1 AND a.status <> 'canceled' ORDER BY a.datetime DESC",
                    VISIT_COLUMNS
                ))
                .bind(doctor_id)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(DoctorVisit::from).collect())
    }

    pub async fn today_visits(pool: &PgPool, doctor_id: &str) -> Result<Vec<DoctorVisit>, AppError> {
        let (start, end) =
            today_range().ok_or_else(|| AppError::Internal("Nie można ustalić bieżącej daty".to_string()))?;

        let rows = sqlx::query_as::<_, VisitRow>(&format!(
            "{} WHERE a.doctor_id = $1 AND a.status = 'scheduled'
               AND a.datetime >= $2 AND a.datetime < $3
             ORDER BY a.datetime DESC",
            VISIT_COLUMNS
        ))
        .bind(doctor_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(DoctorVisit::from).collect())
    }

    /// One entry per patient, keyed on their most recent appointment.
    pub async fn patients(pool: &PgPool, doctor_id: &str) -> Result<Vec<DoctorPatient>, AppError> {
        let patients = sqlx::query_as::<_, DoctorPatient>(
            r#"SELECT * FROM (
                   SELECT DISTINCT ON (a.patient_id)
                          a.patient_id, a.appointment_id AS last_appointment_id,
                          a.datetime AS last_appointment_datetime,
                          a.status AS last_appointment_status,
                          u.name AS patient_name, u.email AS patient_email
                   FROM appointments a
                   LEFT JOIN "user" u ON u.id = a.patient_id
                   WHERE a.doctor_id = $1
                   ORDER BY a.patient_id, a.datetime DESC
               ) latest
               ORDER BY last_appointment_datetime DESC"#,
        )
        .bind(doctor_id)
        .fetch_all(pool)
        .await?;

        Ok(patients)
    }

    /// Completed visits from the last two months grouped by week.
    pub async fn handled_visits(pool: &PgPool, doctor_id: &str) -> Result<Vec<WeeklyCount>, AppError> {
        let weeks = sqlx::query_as::<_, WeeklyCount>(
            r#"SELECT to_char(date_trunc('week', datetime AT TIME ZONE 'Europe/Warsaw'), 'YYYY-MM-DD') AS week_start,
                      count(*) AS count
               FROM appointments
               WHERE doctor_id = $1 AND status = 'completed'
                 AND datetime >= now() - interval '2 months'
               GROUP BY 1
               ORDER BY 1"#,
        )
        .bind(doctor_id)
        .fetch_all(pool)
        .await?;

        Ok(weeks)
    }

    pub async fn visit_types(pool: &PgPool, doctor_id: &str) -> Result<VisitTypeCounts, AppError> {
        let counts = sqlx::query_as::<_, VisitTypeCounts>(
            r#"SELECT count(*) FILTER (WHERE is_online = FALSE) AS onsite,
                      count(*) FILTER (WHERE is_online = TRUE) AS remote
               FROM appointments
               WHERE doctor_id = $1 AND status = 'completed'"#,
        )
        .bind(doctor_id)
        .fetch_one(pool)
        .await?;

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn completing_a_scheduled_visit_is_rejected() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let pool = PgPool::connect(&url).await.unwrap();
        let doctor_id: String = sqlx::query_scalar("SELECT user_id FROM doctors LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        let appointment_id: i32 = sqlx::query_scalar(
            "SELECT appointment_id FROM appointments WHERE doctor_id = $1 AND status = 'scheduled' LIMIT 1",
        )
        .bind(&doctor_id)
        .fetch_one(&pool)
        .await
        .unwrap();

        let request = CompleteVisitRequest {
            visit_goal: "Kontrola".into(),
            ..Default::default()
        };
        let err = DoctorVisitService::complete_visit(&pool, &doctor_id, appointment_id, &request)
            .await
            .unwrap_err();
        assert_eq!(err.message(), NOT_CHECKED_IN);
    }
}
