use chrono::Duration;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info, warn};

use shared_utils::datetime::{minutes_of_day, to_local};

use crate::models::{
    AppointmentStatus, BookedAppointment, BookingError, BookingRequest, RoomSelection, TimeRange,
};
use crate::services::availability::frames_for_day;
use crate::services::conflict::{ConflictDetectionService, ConflictScope};
use crate::services::slots::fits_within_frames;

pub struct BookingService;

impl BookingService {
    /// Books inside its own transaction.
    pub async fn book_appointment(
        pool: &PgPool,
        request: &BookingRequest,
    ) -> Result<BookedAppointment, BookingError> {
        let mut tx = pool.begin().await?;
        let booked = Self::book(&mut tx, request).await?;
        tx.commit().await?;
        Ok(booked)
    }

    /// Books on an open transaction. The doctor row stays locked until the
    /// caller commits, so concurrent bookings for one doctor run one at a time.
    pub async fn book(
        conn: &mut PgConnection,
        request: &BookingRequest,
    ) -> Result<BookedAppointment, BookingError> {
        info!(
            "Booking {} for patient {} with doctor {} at {}",
            request.kind, request.patient_id, request.doctor_id, request.start
        );

        let doctor: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM doctors WHERE user_id = $1 FOR UPDATE")
                .bind(&request.doctor_id)
                .fetch_optional(&mut *conn)
                .await?;
        if doctor.is_none() {
            return Err(BookingError::DoctorNotFound);
        }

        let duration = request.kind.duration_minutes();
        let start = request.start;
        let end = start + Duration::minutes(i64::from(duration));

        let day = to_local(start).date_naive();
        let start_minutes = minutes_of_day(start);
        let requested = TimeRange::new(start_minutes, start_minutes + duration);

        let frames = frames_for_day(&mut *conn, &request.doctor_id, day).await?;
        if !fits_within_frames(&frames, &requested) {
            debug!("Requested {:?} on {} is outside {:?}", requested, day, frames);
            return Err(BookingError::OutsideAvailability);
        }

        if ConflictDetectionService::has_conflict(
            &mut *conn,
            ConflictScope::Doctor(&request.doctor_id),
            start,
            end,
        )
        .await?
        {
            return Err(BookingError::SlotTaken);
        }

        let room_id = Self::resolve_room(&mut *conn, request.room).await?;

        if let Some(room_id) = room_id {
            if !request.is_online
                && ConflictDetectionService::has_conflict(&mut *conn, ConflictScope::Room(room_id), start, end)
                    .await?
            {
                warn!("Room {} is taken at {}", room_id, start);
                return Err(BookingError::RoomNotAvailable);
            }
        }

        let booked = sqlx::query_as::<_, BookedAppointment>(
            r#"INSERT INTO appointments
                   (patient_id, doctor_id, datetime, status, type, is_online, notes, room_room_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING appointment_id, status, type AS kind, room_room_id AS room_id"#,
        )
        .bind(&request.patient_id)
        .bind(&request.doctor_id)
        .bind(start)
        .bind(AppointmentStatus::Scheduled)
        .bind(request.kind)
        .bind(request.is_online)
        .bind(request.notes.as_deref())
        .bind(room_id)
        .fetch_one(&mut *conn)
        .await?;

        info!(
            "Appointment {} booked with doctor {} (room {:?})",
            booked.appointment_id, request.doctor_id, booked.room_id
        );
        Ok(booked)
    }

    async fn resolve_room(
        conn: &mut PgConnection,
        selection: RoomSelection,
    ) -> Result<Option<i32>, BookingError> {
        match selection {
            RoomSelection::Unassigned => Ok(None),
            RoomSelection::Requested(room_id) => {
                let found: Option<i32> =
                    sqlx::query_scalar("SELECT room_id FROM room WHERE room_id = $1 FOR UPDATE")
                        .bind(room_id)
                        .fetch_optional(conn)
                        .await?;
                found.map(Some).ok_or(BookingError::RoomNotFound)
            }
            RoomSelection::FirstConfigured => {
                let first: Option<i32> =
                    sqlx::query_scalar("SELECT room_id FROM room ORDER BY number ASC LIMIT 1 FOR UPDATE")
                        .fetch_optional(conn)
                        .await?;
                first.map(Some).ok_or(BookingError::NoRoomsConfigured)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::models::AppointmentType;
    use shared_utils::datetime::local_datetime;

    fn request(kind: AppointmentType) -> BookingRequest {
        let day = chrono::NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        BookingRequest {
            patient_id: "patient-1".to_string(),
            doctor_id: "doctor-1".to_string(),
            start: local_datetime(day, 23 * 60 + 40).unwrap(),
            kind,
            is_online: false,
            notes: None,
            room: RoomSelection::Unassigned,
        }
    }

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        PgPool::connect(&url).await.unwrap()
    }

    async fn insert_user(pool: &PgPool, role: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(r#"INSERT INTO "user" (id, name, email, role) VALUES ($1, 'Test', $2, $3)"#)
            .bind(&id)
            .bind(format!("{}@example.com", id))
            .bind(role)
            .execute(pool)
            .await
            .unwrap();
        id
    }

    /// A doctor available 08:00-12:00 on `day` and a patient.
    async fn seed(pool: &PgPool, day: chrono::NaiveDate) -> (String, String) {
        let doctor_id = insert_user(pool, "doctor").await;
        sqlx::query("INSERT INTO doctors (user_id) VALUES ($1)")
            .bind(&doctor_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            r#"INSERT INTO availability (schedule_id, day, time_start, time_end, doctors_user_id)
               VALUES ($1, $2, '08:00', '12:00', $3)"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(day)
        .bind(&doctor_id)
        .execute(pool)
        .await
        .unwrap();

        let patient_id = insert_user(pool, "user").await;
        sqlx::query(
            "INSERT INTO patients (user_id, pesel, pesel_hmac, address) VALUES ($1, 'encrypted', $2, 'ul. Testowa 1')",
        )
        .bind(&patient_id)
        .bind(uuid::Uuid::new_v4().to_string())
        .execute(pool)
        .await
        .unwrap();

        (doctor_id, patient_id)
    }

    fn booking_at(doctor_id: &str, patient_id: &str, day: chrono::NaiveDate, minutes: u32) -> BookingRequest {
        BookingRequest {
            patient_id: patient_id.to_string(),
            doctor_id: doctor_id.to_string(),
            start: local_datetime(day, minutes).unwrap(),
            kind: AppointmentType::Consultation,
            is_online: false,
            notes: None,
            room: RoomSelection::Unassigned,
        }
    }

    fn next_month() -> chrono::NaiveDate {
        shared_utils::datetime::today_local() + chrono::Days::new(30)
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn unknown_doctor_is_rejected() {
        let pool = pool().await;
        let mut req = request(AppointmentType::Consultation);
        req.doctor_id = uuid::Uuid::new_v4().to_string();

        let err = BookingService::book_appointment(&pool, &req).await.unwrap_err();
        assert!(matches!(err, BookingError::DoctorNotFound));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn second_booking_of_a_slot_is_refused() {
        let pool = pool().await;
        let day = next_month();
        let (doctor_id, patient_id) = seed(&pool, day).await;

        BookingService::book_appointment(&pool, &booking_at(&doctor_id, &patient_id, day, 9 * 60))
            .await
            .unwrap();

        let overlapping = booking_at(&doctor_id, &patient_id, day, 9 * 60 + 10);
        let err = BookingService::book_appointment(&pool, &overlapping).await.unwrap_err();
        assert_matches!(err, BookingError::SlotTaken);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn canceled_visit_frees_its_slot() {
        let pool = pool().await;
        let day = next_month();
        let (doctor_id, patient_id) = seed(&pool, day).await;
        let req = booking_at(&doctor_id, &patient_id, day, 10 * 60);

        let first = BookingService::book_appointment(&pool, &req).await.unwrap();
        sqlx::query("UPDATE appointments SET status = 'canceled' WHERE appointment_id = $1")
            .bind(first.appointment_id)
            .execute(&pool)
            .await
            .unwrap();

        let second = BookingService::book_appointment(&pool, &req).await.unwrap();
        assert_ne!(second.appointment_id, first.appointment_id);
        assert_eq!(second.status, AppointmentStatus::Scheduled);
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn stationary_visits_cannot_share_a_room() {
        let pool = pool().await;
        let day = next_month();
        let (first_doctor, patient_id) = seed(&pool, day).await;
        let (second_doctor, _) = seed(&pool, day).await;
        let room_id: i32 = sqlx::query_scalar("INSERT INTO room (number) VALUES ($1) RETURNING room_id")
            .bind(10_000 + (uuid::Uuid::new_v4().as_u128() % 1_000_000_000) as i32)
            .fetch_one(&pool)
            .await
            .unwrap();

        let mut first = booking_at(&first_doctor, &patient_id, day, 11 * 60);
        first.room = RoomSelection::Requested(room_id);
        BookingService::book_appointment(&pool, &first).await.unwrap();

        let mut second = booking_at(&second_doctor, &patient_id, day, 11 * 60);
        second.room = RoomSelection::Requested(room_id);
        let err = BookingService::book_appointment(&pool, &second).await.unwrap_err();
        assert_matches!(err, BookingError::RoomNotAvailable);
    }
}
