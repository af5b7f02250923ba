use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;

use shared_utils::datetime::{
    day_range_utc, local_datetime, minutes_of_day, naive_time_minutes, slot_string, to_local,
};

use crate::models::{AppointmentType, SlotQuery, SlotWindow, TimeRange};
use crate::services::conflict::BusyAppointment;
use crate::services::slots::generate_slots;

#[derive(Debug, FromRow)]
struct FrameRow {
    day: NaiveDate,
    time_start: NaiveTime,
    time_end: NaiveTime,
}

impl FrameRow {
    fn range(&self) -> TimeRange {
        TimeRange::new(naive_time_minutes(self.time_start), naive_time_minutes(self.time_end))
    }
}

/// Availability frames of one doctor on one clinic-local day.
pub async fn frames_for_day(
    conn: &mut PgConnection,
    doctor_id: &str,
    day: NaiveDate,
) -> Result<Vec<TimeRange>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FrameRow>(
        r#"SELECT day, time_start, time_end
           FROM availability
           WHERE doctors_user_id = $1 AND day = $2"#,
    )
    .bind(doctor_id)
    .bind(day)
    .fetch_all(conn)
    .await?;

    Ok(rows.iter().map(FrameRow::range).collect())
}

pub struct SlotService;

impl SlotService {
    /// Free slots of a doctor across the requested days, earliest first.
    /// Slots that already started are left out.
    pub async fn doctor_slots(
        pool: &PgPool,
        doctor_id: &str,
        query: &SlotQuery,
    ) -> Result<Vec<SlotWindow>, sqlx::Error> {
        let (Some(first), Some(last)) = (query.dates.first(), query.dates.last()) else {
            return Ok(Vec::new());
        };
        let (Some((range_start, _)), Some((_, range_end))) = (day_range_utc(*first), day_range_utc(*last)) else {
            return Ok(Vec::new());
        };

        let frames = sqlx::query_as::<_, FrameRow>(
            r#"SELECT day, time_start, time_end
               FROM availability
               WHERE doctors_user_id = $1 AND day >= $2 AND day <= $3"#,
        )
        .bind(doctor_id)
        .bind(first)
        .bind(last)
        .fetch_all(pool)
        .await?;

        if frames.is_empty() {
            debug!("Doctor {} has no availability between {} and {}", doctor_id, first, last);
            return Ok(Vec::new());
        }

        let lookback = Duration::minutes(i64::from(AppointmentType::Procedure.duration_minutes()));
        let busy = sqlx::query_as::<_, BusyAppointment>(
            r#"SELECT appointment_id, datetime, type AS kind
               FROM appointments
               WHERE doctor_id = $1
                 AND datetime >= $2 AND datetime < $3
                 AND status IN ('scheduled', 'checked_in')"#,
        )
        .bind(doctor_id)
        .bind(range_start - lookback)
        .bind(range_end)
        .fetch_all(pool)
        .await?;

        let mut frames_by_day: HashMap<NaiveDate, Vec<TimeRange>> = HashMap::new();
        for frame in &frames {
            frames_by_day.entry(frame.day).or_default().push(frame.range());
        }

        let mut busy_by_day: HashMap<NaiveDate, Vec<TimeRange>> = HashMap::new();
        for appointment in &busy {
            let day = to_local(appointment.datetime).date_naive();
            let start = minutes_of_day(appointment.datetime);
            let end = start + appointment.kind.duration_minutes();
            busy_by_day.entry(day).or_default().push(TimeRange::new(start, end));
            // A late visit that runs past midnight still blocks the next morning.
            if end > 24 * 60 {
                if let Some(next) = day.succ_opt() {
                    busy_by_day.entry(next).or_default().push(TimeRange::new(0, end - 24 * 60));
                }
            }
        }

        let duration = query.kind.duration_minutes();
        let now = Utc::now();
        let mut windows = Vec::new();

        for date in &query.dates {
            let Some(day_frames) = frames_by_day.get(date) else {
                continue;
            };
            let day_busy = busy_by_day.get(date).map(Vec::as_slice).unwrap_or(&[]);

            for start in generate_slots(day_frames, day_busy, duration, query.window) {
                let upcoming = local_datetime(*date, start).is_some_and(|at| at > now);
                if !upcoming {
                    continue;
                }
                windows.push(SlotWindow {
                    start: slot_string(*date, start),
                    end: slot_string(*date, start + duration),
                });
            }
        }

        debug!("Generated {} slots for doctor {}", windows.len(), doctor_id);
        Ok(windows)
    }
}
