use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info};

use appointment_cell::{
    AppointmentLifecycleService, AppointmentStatus, AppointmentType, BookedAppointment,
    BookingError, BookingRequest, BookingService, PrescriptionStatus, RoomSelection,
    ACCESS_DENIED, APPOINTMENT_NOT_FOUND,
};
use shared_models::error::AppError;
use shared_utils::datetime::parse_client_datetime;

use crate::models::{
    AccountInfo, AppointmentDetailRow, AppointmentStatusResponse, BookVisitRequest,
    PatientAppointmentDetail, PatientDashboard, PatientError, PatientOverview, PatientVisit,
    PrescriptionStatusResponse, PrescriptionSummary, RecommendationEntry, SpecializationOption,
    TestResult, UpcomingAppointment, DASHBOARD_PRESCRIPTIONS_LIMIT, DASHBOARD_RESULTS_LIMIT,
    RECENT_RESULTS_LIMIT, UPCOMING_LIMIT,
};

const VISIT_COLUMNS: &str = r#"
    SELECT a.appointment_id, a.datetime, a.status, a.notes, a.doctor_id,
           u.name AS doctor_name, u.email AS doctor_email,
           r.room_id, r.number AS room_number
    FROM appointments a
    LEFT JOIN "user" u ON u.id = a.doctor_id
    LEFT JOIN room r ON r.room_id = a.room_room_id"#;

/// One row per prescription, newest first; `$2` filters by status, `$3` caps the list.
const PRESCRIPTIONS_QUERY: &str = r#"
    SELECT * FROM (
        SELECT DISTINCT ON (pr.prescription_id)
               pr.prescription_id, pr.issued_at, pr.status,
               a.appointment_id, a.datetime AS appointment_datetime, a.doctor_id,
               u.name AS doctor_name, u.email AS doctor_email,
               COALESCE((SELECT array_agg(m.description ORDER BY m.created_at, m.medication_id)
                           FROM medications m
                          WHERE m.prescription_id = pr.prescription_id), '{}') AS medications
        FROM appointments a
        JOIN prescriptions pr ON pr.prescription_id = a.prescription_id
        LEFT JOIN "user" u ON u.id = a.doctor_id
        WHERE a.patient_id = $1 AND ($2::prescription_status IS NULL OR pr.status = $2)
        ORDER BY pr.prescription_id, a.datetime DESC
    ) unique_prescriptions
    ORDER BY issued_at DESC
    LIMIT $3"#;

pub struct PatientService {
    db: PgPool,
}

impl PatientService {
    pub fn new(db: &PgPool) -> Self {
        Self { db: db.clone() }
    }

    pub async fn ensure_profile(&self, user_id: &str) -> Result<(), PatientError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM patients WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(PatientError::ProfileNotFound)
        }
    }

    // ==========================================================================
    // VISITS
    // ==========================================================================

    pub async fn visits(&self, patient_id: &str) -> Result<Vec<PatientVisit>, PatientError> {
        let visits = sqlx::query_as::<_, PatientVisit>(&format!(
            "{} WHERE a.patient_id = $1 ORDER BY a.datetime ASC",
            VISIT_COLUMNS
        ))
        .bind(patient_id)
        .fetch_all(&self.db)
        .await?;
        Ok(visits)
    }

    /// Future visits, soonest first; `scheduled_only` drops checked-in and closed ones.
    pub async fn upcoming_visits(
        &self,
        patient_id: &str,
        scheduled_only: bool,
        limit: i64,
    ) -> Result<Vec<PatientVisit>, PatientError> {
        let visits = sqlx::query_as::<_, PatientVisit>(&format!(
            "{} WHERE a.patient_id = $1 AND a.datetime >= $2
               AND (NOT $3 OR a.status = 'scheduled')
             ORDER BY a.datetime ASC
             LIMIT $4",
            VISIT_COLUMNS
        ))
        .bind(patient_id)
        .bind(Utc::now())
        .bind(scheduled_only)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(visits)
    }

    pub async fn appointment_detail(
        &self,
        patient_id: &str,
        appointment_id: i32,
    ) -> Result<PatientAppointmentDetail, AppError> {
        let row = sqlx::query_as::<_, AppointmentDetailRow>(
            r#"SELECT a.appointment_id, a.patient_id, a.datetime, a.status, a.type AS kind,
                      a.is_online, a.notes, u.name AS doctor_name,
                      r.room_id, r.number AS room_number,
                      rec.content AS recommendation, pr.prescription_id,
                      (SELECT array_agg(m.description ORDER BY m.created_at, m.medication_id)
                         FROM medications m
                        WHERE m.prescription_id = pr.prescription_id) AS medications
               FROM appointments a
               LEFT JOIN "user" u ON u.id = a.doctor_id
               LEFT JOIN room r ON r.room_id = a.room_room_id
               LEFT JOIN recommendations rec ON rec.recommendation_id = a.recommendation_id
               LEFT JOIN prescriptions pr ON pr.prescription_id = a.prescription_id
               WHERE a.appointment_id = $1"#,
        )
        .bind(appointment_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(APPOINTMENT_NOT_FOUND.to_string()))?;

        if row.patient_id != patient_id {
            return Err(AppError::Forbidden(ACCESS_DENIED.to_string()));
        }

        Ok(row.into())
    }

    pub async fn cancel_appointment(
        &self,
        patient_id: &str,
        appointment_id: i32,
    ) -> Result<AppointmentStatusResponse, PatientError> {
        let current: Option<AppointmentStatus> = sqlx::query_scalar(
            "SELECT status FROM appointments WHERE appointment_id = $1 AND patient_id = $2",
        )
        .bind(appointment_id)
        .bind(patient_id)
        .fetch_optional(&self.db)
        .await?;

        let current = current.ok_or(PatientError::AppointmentNotFound)?;
        if !AppointmentLifecycleService::patient_can_cancel(current) {
            return Err(PatientError::NotCancelable);
        }

        let updated = sqlx::query_as::<_, AppointmentStatusResponse>(
            r#"UPDATE appointments SET status = $3
               WHERE appointment_id = $1 AND patient_id = $2 AND status = 'scheduled'
               RETURNING appointment_id, status"#,
        )
        .bind(appointment_id)
        .bind(patient_id)
        .bind(AppointmentStatus::Canceled)
        .fetch_optional(&self.db)
        .await?
        .ok_or(PatientError::NotCancelable)?;

        info!("Patient {} canceled appointment {}", patient_id, appointment_id);
        Ok(updated)
    }

    /// Books a consultation, in the requested room or the first one configured.
    pub async fn book_visit(
        &self,
        patient_id: &str,
        request: &BookVisitRequest,
    ) -> Result<BookedAppointment, BookingError> {
        let start = parse_client_datetime(&request.datetime).ok_or(BookingError::InvalidDatetime)?;
        let room = match request.room_id {
            Some(room_id) => RoomSelection::Requested(room_id),
            None => RoomSelection::FirstConfigured,
        };

        BookingService::book_appointment(
            &self.db,
            &BookingRequest {
                patient_id: patient_id.to_string(),
                doctor_id: request.doctor_id.clone(),
                start,
                kind: AppointmentType::Consultation,
                is_online: request.is_online,
                notes: request.notes.clone(),
                room,
            },
        )
        .await
    }

    // ==========================================================================
    // PRESCRIPTIONS
    // ==========================================================================

    pub async fn prescriptions(
        &self,
        patient_id: &str,
        status: Option<PrescriptionStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<PrescriptionSummary>, PatientError> {
        let rows = sqlx::query_as::<_, PrescriptionSummary>(PRESCRIPTIONS_QUERY)
            .bind(patient_id)
            .bind(status)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn fulfill_prescription(
        &self,
        patient_id: &str,
        prescription_id: i32,
    ) -> Result<PrescriptionStatusResponse, PatientError> {
        let current: Option<PrescriptionStatus> = sqlx::query_scalar(
            r#"SELECT pr.status FROM appointments a
               JOIN prescriptions pr ON pr.prescription_id = a.prescription_id
               WHERE a.patient_id = $1 AND pr.prescription_id = $2
               LIMIT 1"#,
        )
        .bind(patient_id)
        .bind(prescription_id)
        .fetch_optional(&self.db)
        .await?;

        match current.ok_or(PatientError::PrescriptionNotFound)? {
            PrescriptionStatus::Active => {}
            PrescriptionStatus::Fulfilled => return Err(PatientError::NotFulfillable),
        }

        let updated = sqlx::query_as::<_, PrescriptionStatusResponse>(
            r#"UPDATE prescriptions SET status = $2
               WHERE prescription_id = $1
               RETURNING prescription_id, status"#,
        )
        .bind(prescription_id)
        .bind(PrescriptionStatus::Fulfilled)
        .fetch_one(&self.db)
        .await?;

        info!("Patient {} fulfilled prescription {}", patient_id, prescription_id);
        Ok(updated)
    }

    // ==========================================================================
    // RESULTS & RECOMMENDATIONS
    // ==========================================================================

    pub async fn results(&self, patient_id: &str, limit: Option<i64>) -> Result<Vec<TestResult>, PatientError> {
        let rows = sqlx::query_as::<_, TestResult>(
            r#"SELECT t.test_id, t.test_type, t.result, t.test_date, t.file_path
               FROM test_results t
               JOIN medical_records mr ON mr.record_id = t.record_id
               WHERE mr.patient_id = $1
               ORDER BY t.test_date DESC, t.test_id DESC
               LIMIT $2"#,
        )
        .bind(patient_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn recommendations(&self, patient_id: &str) -> Result<Vec<RecommendationEntry>, PatientError> {
        let rows = sqlx::query_as::<_, RecommendationEntry>(
            r#"SELECT * FROM (
                   SELECT DISTINCT ON (rec.recommendation_id)
                          rec.recommendation_id, rec.content, rec.created_at,
                          a.appointment_id, a.datetime AS appointment_datetime, a.doctor_id,
                          u.name AS doctor_name, u.email AS doctor_email
                   FROM appointments a
                   JOIN recommendations rec ON rec.recommendation_id = a.recommendation_id
                   LEFT JOIN "user" u ON u.id = a.doctor_id
                   WHERE a.patient_id = $1
                   ORDER BY rec.recommendation_id, a.datetime DESC
               ) unique_recommendations
               ORDER BY created_at DESC"#,
        )
        .bind(patient_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn specializations(&self) -> Result<Vec<SpecializationOption>, PatientError> {
        let rows = sqlx::query_as::<_, SpecializationOption>("SELECT id, name FROM specializations ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    // ==========================================================================
    // DASHBOARD & OVERVIEW
    // ==========================================================================

    pub async fn dashboard(&self, patient_id: &str) -> Result<PatientDashboard, PatientError> {
        let upcoming_visits = self.upcoming_visits(patient_id, true, UPCOMING_LIMIT).await?;
        let recent_results = self.results(patient_id, Some(DASHBOARD_RESULTS_LIMIT)).await?;
        let active_prescriptions = self
            .prescriptions(
                patient_id,
                Some(PrescriptionStatus::Active),
                Some(DASHBOARD_PRESCRIPTIONS_LIMIT),
            )
            .await?;

        debug!(
            "Dashboard for {}: {} visits, {} results, {} prescriptions",
            patient_id,
            upcoming_visits.len(),
            recent_results.len(),
            active_prescriptions.len()
        );

        Ok(PatientDashboard {
            upcoming_visits,
            recent_results,
            active_prescriptions,
        })
    }

    pub async fn recent_results(&self, patient_id: &str) -> Result<Vec<TestResult>, PatientError> {
        self.results(patient_id, Some(RECENT_RESULTS_LIMIT)).await
    }

    pub async fn overview(&self, user_id: &str) -> Result<PatientOverview, PatientError> {
        let user = sqlx::query_as::<_, AccountInfo>(
            r#"SELECT id, email, name, role, email_verified, created_at FROM "user" WHERE id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(PatientError::ProfileNotFound)?;
        self.ensure_profile(user_id).await?;

        let upcoming = sqlx::query_as::<_, UpcomingAppointment>(
            r#"SELECT appointment_id, datetime, status, doctor_id
               FROM appointments
               WHERE patient_id = $1 AND datetime >= $2 AND status = 'scheduled'
               ORDER BY datetime ASC"#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_all(&self.db)
        .await?;

        let visits_count: i64 = sqlx::query_scalar("SELECT count(*) FROM appointments WHERE patient_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        let prescriptions = self
            .prescriptions(user_id, Some(PrescriptionStatus::Active), None)
            .await?;
        let results = self.results(user_id, None).await?;

        Ok(PatientOverview::assemble(user, upcoming, prescriptions, results, visits_count))
    }
}
