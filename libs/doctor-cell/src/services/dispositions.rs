use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use appointment_cell::{merge_frames, TimeRange};
use shared_models::error::AppError;
use shared_utils::datetime::{minutes_to_time, naive_time_minutes, today_local};

use crate::models::{
    DispositionSlot, SaveDispositionsRequest, Timeframe, TodayDispositions, DOCTOR_PROFILE_NOT_FOUND,
};

pub struct DispositionService;

impl DispositionService {
    pub async fn list(
        pool: &PgPool,
        doctor_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<DispositionSlot>, AppError> {
        let slots = sqlx::query_as::<_, DispositionSlot>(
            r#"SELECT schedule_id, day, time_start, time_end, doctors_user_id AS doctor_user_id
               FROM availability
               WHERE doctors_user_id = $1
                 AND ($2::date IS NULL OR day >= $2)
                 AND ($3::date IS NULL OR day <= $3)
               ORDER BY day, time_start"#,
        )
        .bind(doctor_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

        Ok(slots)
    }

    /// Replaces the doctor's availability on every submitted date; returns the number of frames written.
    pub async fn replace(
        pool: &PgPool,
        doctor_id: &str,
        request: &SaveDispositionsRequest,
    ) -> Result<usize, AppError> {
        let dates = request.unique_dates();
        let mut tx = pool.begin().await?;

        let removed = sqlx::query("DELETE FROM availability WHERE doctors_user_id = $1 AND day = ANY($2)")
            .bind(doctor_id)
            .bind(&dates)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for day in &request.days {
            let start = hour_time(day.start_hour)?;
            let end = hour_time(day.end_hour)?;
            sqlx::query(
                r#"INSERT INTO availability (schedule_id, day, time_start, time_end, doctors_user_id)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(day.date)
            .bind(start)
            .bind(end)
            .bind(doctor_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            "Doctor {} replaced availability on {} dates ({} removed, {} added)",
            doctor_id,
            dates.len(),
            removed,
            request.days.len()
        );

        Ok(request.days.len())
    }

    /// Today's merged working hours and the room tied to the doctor's specialization.
    pub async fn today(pool: &PgPool, doctor_id: &str) -> Result<TodayDispositions, AppError> {
        let doctor: Option<(Option<i32>,)> =
            sqlx::query_as("SELECT specialization_id FROM doctors WHERE user_id = $1")
                .bind(doctor_id)
                .fetch_optional(pool)
                .await?;
        let (specialization_id,) =
            doctor.ok_or_else(|| AppError::NotFound(DOCTOR_PROFILE_NOT_FOUND.to_string()))?;

        let room_number = match specialization_id {
            Some(id) => sqlx::query_scalar::<_, i32>(
                r#"SELECT r.number FROM room_specializations rs
                   JOIN room r ON r.room_id = rs.room_id
                   WHERE rs.specialization_id = $1
                   ORDER BY r.number
                   LIMIT 1"#,
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .unwrap_or_else(|e| {
                warn!("Room lookup for specialization {} failed: {}", id, e);
                None
            }),
            None => None,
        };

        let day = today_local();
        let frames: Vec<(NaiveTime, NaiveTime)> = sqlx::query_as(
            "SELECT time_start, time_end FROM availability WHERE doctors_user_id = $1 AND day = $2 ORDER BY time_start",
        )
        .bind(doctor_id)
        .bind(day)
        .fetch_all(pool)
        .await?;

        Ok(TodayDispositions {
            day,
            timeframes: merged_timeframes(&frames),
            room_number,
        })
    }
}

fn hour_time(hour: u32) -> Result<NaiveTime, AppError> {
    NaiveTime::from_hms_opt(hour, 0, 0)
        .ok_or_else(|| AppError::ValidationError("Godzina musi być z zakresu 0-23".to_string()))
}

pub fn merged_timeframes(frames: &[(NaiveTime, NaiveTime)]) -> Vec<Timeframe> {
    let ranges: Vec<TimeRange> = frames
        .iter()
        .map(|(start, end)| TimeRange::new(naive_time_minutes(*start), naive_time_minutes(*end)))
        .collect();

    merge_frames(&ranges)
        .into_iter()
        .map(|frame| Timeframe {
            start: minutes_to_time(frame.start),
            end: minutes_to_time(frame.end),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn overlapping_and_touching_frames_merge() {
        let frames = vec![(t(12, 0), t(14, 0)), (t(8, 0), t(10, 0)), (t(10, 0), t(11, 0)), (t(13, 0), t(15, 30))];
        assert_eq!(
            merged_timeframes(&frames),
            vec![
                Timeframe { start: "08:00".into(), end: "11:00".into() },
                Timeframe { start: "12:00".into(), end: "15:30".into() },
            ]
        );
    }

    #[test]
    fn no_frames_means_no_timeframes() {
        assert!(merged_timeframes(&[]).is_empty());
    }
}
