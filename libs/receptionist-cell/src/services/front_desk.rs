use sqlx::PgPool;
use tracing::{debug, info, warn};

use appointment_cell::{
    AppointmentLifecycleService, AppointmentStatus, BookingError, BookingRequest, BookingService,
    RoomSelection,
};
use notification_cell::{AppointmentEmail, Notifier, SUBJECT_CANCELED_BY_RECEPTION};
use shared_utils::datetime::{format_pl_datetime, parse_client_datetime, today_local, today_range};
use shared_utils::names::{build_person_name, DEFAULT_DOCTOR_NAME, DEFAULT_PATIENT_NAME};
use shared_utils::pesel::pesel_hmac;

use crate::models::{
    CancelTarget, CanceledAppointment, CheckInRequest, CheckInResponse, CheckInTarget,
    CreateAppointmentRequest, CreateAppointmentResponse, DirectoryUser, DirectoryUserRow,
    PatientAppointment, ReceptionError, TodayVisit, TodayVisitRow, VisitsToday,
};

pub struct FrontDeskService;

impl FrontDeskService {
    // ==========================================================================
    // APPOINTMENTS
    // ==========================================================================

    /// Cancels a scheduled or checked-in visit and queues a notice for the patient.
    pub async fn cancel_appointment(
        pool: &PgPool,
        notifier: &Notifier,
        appointment_id: i32,
    ) -> Result<CanceledAppointment, ReceptionError> {
        let mut tx = pool.begin().await?;

        let target = sqlx::query_as::<_, CancelTarget>(
            r#"SELECT a.status, a.datetime, a.type AS kind, a.is_online,
                      pu.name AS patient_name, pu.email AS patient_email,
                      du.name AS doctor_name
               FROM appointments a
               LEFT JOIN "user" pu ON pu.id = a.patient_id
               LEFT JOIN "user" du ON du.id = a.doctor_id
               WHERE a.appointment_id = $1
               FOR UPDATE OF a"#,
        )
        .bind(appointment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ReceptionError::AppointmentNotFound)?;

        if !AppointmentLifecycleService::staff_can_cancel(target.status) {
            return Err(ReceptionError::NotCancelable);
        }

        let updated = sqlx::query_as::<_, CanceledAppointment>(
            r#"UPDATE appointments SET status = $2
               WHERE appointment_id = $1
               RETURNING appointment_id, status"#,
        )
        .bind(appointment_id)
        .bind(AppointmentStatus::Canceled)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Reception canceled appointment {}", appointment_id);

        match (&target.patient_email, &target.doctor_name) {
            (Some(email), Some(doctor_name)) => {
                let data = AppointmentEmail::new(
                    build_person_name(None, None, target.patient_name.as_deref(), DEFAULT_PATIENT_NAME),
                    build_person_name(None, None, Some(doctor_name), DEFAULT_DOCTOR_NAME),
                    format_pl_datetime(target.datetime),
                    target.is_online,
                    target.kind,
                );
                if let Err(e) = notifier
                    .appointment_canceled(email, SUBJECT_CANCELED_BY_RECEPTION, &data)
                    .await
                {
                    warn!("Cancellation notice for appointment {} not queued: {}", appointment_id, e);
                }
            }
            _ => debug!("Appointment {} has no reachable patient or doctor; no notice sent", appointment_id),
        }

        Ok(updated)
    }

    /// Books on behalf of a patient. The room stays empty until reception assigns one.
    pub async fn create_appointment(
        pool: &PgPool,
        request: &CreateAppointmentRequest,
    ) -> Result<CreateAppointmentResponse, ReceptionError> {
        let role: Option<String> = sqlx::query_scalar(r#"SELECT role FROM "user" WHERE id = $1"#)
            .bind(&request.patient_id)
            .fetch_optional(pool)
            .await?;
        match role.as_deref() {
            None => return Err(ReceptionError::PatientNotFound),
            Some("user") => {}
            Some(_) => return Err(ReceptionError::NotAPatient),
        }

        let has_profile: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM patients WHERE user_id = $1)")
                .bind(&request.patient_id)
                .fetch_one(pool)
                .await?;
        if !has_profile {
            return Err(ReceptionError::PatientProfileNotFound);
        }

        let start = parse_client_datetime(&request.datetime).ok_or(BookingError::InvalidDatetime)?;
        let booked = BookingService::book_appointment(
            pool,
            &BookingRequest {
                patient_id: request.patient_id.clone(),
                doctor_id: request.doctor_id.clone(),
                start,
                kind: request.kind,
                is_online: request.is_online,
                notes: request.notes.clone(),
                room: RoomSelection::Unassigned,
            },
        )
        .await?;

        Ok(CreateAppointmentResponse {
            appointment_id: booked.appointment_id,
            status: booked.status,
            kind: booked.kind,
        })
    }

    pub async fn patient_appointments(
        pool: &PgPool,
        patient_id: &str,
    ) -> Result<Vec<PatientAppointment>, ReceptionError> {
        if patient_id.trim().is_empty() {
            return Err(ReceptionError::MissingPatientId);
        }

        let rows = sqlx::query_as::<_, PatientAppointment>(
            r#"SELECT a.appointment_id, a.datetime, a.status, a.type AS kind, a.is_online, a.notes,
                      a.doctor_id, u.name AS doctor_name, u.email AS doctor_email,
                      d.specialization_id, s.name AS specialization_name,
                      r.room_id, r.number AS room_number
               FROM appointments a
               LEFT JOIN "user" u ON u.id = a.doctor_id
               LEFT JOIN doctors d ON d.user_id = a.doctor_id
               LEFT JOIN specializations s ON s.id = d.specialization_id
               LEFT JOIN room r ON r.room_id = a.room_room_id
               WHERE a.patient_id = $1
               ORDER BY a.datetime DESC"#,
        )
        .bind(patient_id)
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    // ==========================================================================
    // CHECK-IN
    // ==========================================================================

    /// Marks the patient as present. Stationary visits need a PESEL matching the profile.
    /// Checking in twice is harmless. The visit row stays locked until the status is written.
    pub async fn check_in(
        pool: &PgPool,
        hmac_key: &str,
        request: &CheckInRequest,
    ) -> Result<CheckInResponse, ReceptionError> {
        let mut tx = pool.begin().await?;
        let target = sqlx::query_as::<_, CheckInTarget>(
            r#"SELECT a.appointment_id, a.status, a.patient_id, p.pesel_hmac, a.is_online
               FROM appointments a
               LEFT JOIN patients p ON p.user_id = a.patient_id
               WHERE a.appointment_id = $1
               FOR UPDATE OF a"#,
        )
        .bind(request.appointment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ReceptionError::AppointmentNotFound)?;

        let (Some(patient_id), Some(stored_hmac)) = (&target.patient_id, &target.pesel_hmac) else {
            return Err(ReceptionError::MissingPatientData);
        };

        if !target.status.is_active() {
            return Err(ReceptionError::NotCheckable);
        }

        if !target.is_online {
            let pesel = request.pesel.as_deref().ok_or(ReceptionError::PeselRequired)?;
            if pesel_hmac(hmac_key, pesel)? != *stored_hmac {
                warn!("PESEL mismatch at check-in for appointment {}", target.appointment_id);
                return Err(ReceptionError::PeselMismatch);
            }
        }

        if target.status == AppointmentStatus::CheckedIn {
            return Ok(CheckInResponse {
                status: "ok".to_string(),
                appointment_id: target.appointment_id,
                visit_status: target.status,
            });
        }

        let visit_status: AppointmentStatus = sqlx::query_scalar(
            r#"UPDATE appointments SET status = $3
               WHERE appointment_id = $1 AND patient_id = $2 AND status = 'scheduled'
               RETURNING status"#,
        )
        .bind(target.appointment_id)
        .bind(patient_id)
        .bind(AppointmentStatus::CheckedIn)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ReceptionError::NotCheckable)?;
        tx.commit().await?;

        info!("Appointment {} checked in", target.appointment_id);
        Ok(CheckInResponse {
            status: "ok".to_string(),
            appointment_id: target.appointment_id,
            visit_status,
        })
    }

    // ==========================================================================
    // TODAY
    // ==========================================================================

    pub async fn today_visits(pool: &PgPool) -> Result<Vec<TodayVisit>, ReceptionError> {
        let Some((start, end)) = today_range() else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as::<_, TodayVisitRow>(
            r#"SELECT a.appointment_id, a.datetime, a.status, a.is_online, a.type AS kind,
                      pu.name AS patient_name, pu.email AS patient_email,
                      du.name AS doctor_name, du.email AS doctor_email,
                      r.number AS room_number
               FROM appointments a
               LEFT JOIN "user" pu ON pu.id = a.patient_id
               LEFT JOIN "user" du ON du.id = a.doctor_id
               LEFT JOIN room r ON r.room_id = a.room_room_id
               WHERE a.status IN ('scheduled', 'checked_in')
                 AND a.datetime >= $1 AND a.datetime < $2
               ORDER BY a.datetime ASC"#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(TodayVisit::from).collect())
    }

    pub async fn visits_today_stats(pool: &PgPool) -> Result<VisitsToday, ReceptionError> {
        let day = today_local();
        let Some((start, end)) = today_range() else {
            return Ok(VisitsToday::from_visits(day, &[]));
        };

        let visits: Vec<(chrono::DateTime<chrono::Utc>, bool)> = sqlx::query_as(
            r#"SELECT datetime, is_online FROM appointments
               WHERE status IN ('scheduled', 'checked_in', 'completed')
                 AND datetime >= $1 AND datetime < $2"#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

        Ok(VisitsToday::from_visits(day, &visits))
    }

    pub async fn directory(pool: &PgPool) -> Result<Vec<DirectoryUser>, ReceptionError> {
        let rows = sqlx::query_as::<_, DirectoryUserRow>(
            r#"SELECT u.id AS user_id, u.name, u.email, u.role, u.created_at,
                      d.user_id AS doctor_user_id, d.license_number,
                      s.name AS specialization_name
               FROM "user" u
               LEFT JOIN doctors d ON d.user_id = u.id
               LEFT JOIN specializations s ON s.id = d.specialization_id
               WHERE u.banned = FALSE
               ORDER BY u.name ASC"#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(DirectoryUser::from).collect())
    }
}
