use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::{debug, warn};

use crate::models::{AppointmentType, TimeRange};

/// Half-open interval overlap.
pub fn appointments_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn overlaps_any(candidate: &TimeRange, busy: &[TimeRange]) -> bool {
    busy.iter()
        .any(|b| appointments_overlap(candidate.start, candidate.end, b.start, b.end))
}

#[derive(Debug, Clone, FromRow)]
pub struct BusyAppointment {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub kind: AppointmentType,
}

impl BusyAppointment {
    pub fn end(&self) -> DateTime<Utc> {
        self.datetime + Duration::minutes(i64::from(self.kind.duration_minutes()))
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        appointments_overlap(start, end, self.datetime, self.end())
    }
}

/// Scope of a conflict lookup: one doctor's calendar or one room's calendar.
#[derive(Debug, Clone, Copy)]
pub enum ConflictScope<'a> {
    Doctor(&'a str),
    Room(i32),
}

pub struct ConflictDetectionService;

impl ConflictDetectionService {
    /// Active appointments that could overlap `[from, to)`, locked for the
    /// rest of the transaction. The lower bound is widened by the longest
    /// visit so earlier appointments that run into the window are included.
    pub async fn locked_busy(
        conn: &mut PgConnection,
        scope: ConflictScope<'_>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BusyAppointment>, sqlx::Error> {
        let lookback = from - Duration::minutes(i64::from(AppointmentType::Procedure.duration_minutes()));

        let rows = match scope {
            ConflictScope::Doctor(doctor_id) => {
                sqlx::query_as::<_, BusyAppointment>(
                    r#"SELECT appointment_id, datetime, type AS kind
                       FROM appointments
                       WHERE doctor_id = $1
                         AND datetime >= $2 AND datetime < $3
                         AND status IN ('scheduled', 'checked_in')
                       FOR UPDATE"#,
                )
                .bind(doctor_id)
                .bind(lookback)
                .bind(to)
                .fetch_all(&mut *conn)
                .await?
            }
            ConflictScope::Room(room_id) => {
                sqlx::query_as::<_, BusyAppointment>(
                    r#"SELECT appointment_id, datetime, type AS kind
                       FROM appointments
                       WHERE room_room_id = $1
                         AND is_online = FALSE
                         AND datetime >= $2 AND datetime < $3
                         AND status IN ('scheduled', 'checked_in')
                       FOR UPDATE"#,
                )
                .bind(room_id)
                .bind(lookback)
                .bind(to)
                .fetch_all(&mut *conn)
                .await?
            }
        };

        Ok(rows)
    }

    pub async fn has_conflict(
        conn: &mut PgConnection,
        scope: ConflictScope<'_>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        debug!("Checking conflicts for {:?} from {} to {}", scope, start, end);

        let busy = Self::locked_busy(conn, scope, start, end).await?;
        let conflict = busy.iter().find(|a| a.overlaps(start, end));

        if let Some(existing) = conflict {
            warn!(
                "Conflict detected for {:?}: appointment {} at {}",
                scope, existing.appointment_id, existing.datetime
            );
        }

        Ok(conflict.is_some())
    }
}
