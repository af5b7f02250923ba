use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use appointment_cell::AppointmentType;
use shared_utils::datetime::{format_pl_datetime, local_datetime, to_local, today_range};
use shared_utils::names::{build_person_name, DEFAULT_DOCTOR_NAME, DEFAULT_PATIENT_NAME};

use crate::error::NotificationError;
use crate::models::{AppointmentEmail, ReminderSummary, SUBJECT_REMINDER};
use crate::services::notifier::Notifier;
use crate::templates;

#[derive(Debug, FromRow)]
struct ReminderRow {
    appointment_id: i32,
    datetime: DateTime<Utc>,
    is_online: bool,
    kind: AppointmentType,
    patient_first_name: Option<String>,
    patient_last_name: Option<String>,
    patient_name: Option<String>,
    patient_email: Option<String>,
    doctor_name: Option<String>,
}

pub struct VisitReminderService {
    pool: PgPool,
    notifier: Notifier,
}

impl VisitReminderService {
    pub fn new(pool: PgPool, notifier: Notifier) -> Self {
        Self { pool, notifier }
    }

    /// Queues a reminder for every visit still scheduled today.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ReminderSummary, NotificationError> {
        let Some((start, end)) = today_range() else {
            return Ok(ReminderSummary {
                result: "Success".to_string(),
                queued: 0,
                total: 0,
            });
        };

        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"SELECT a.appointment_id, a.datetime, a.is_online, a.type AS kind,
                      p.first_name AS patient_first_name, p.last_name AS patient_last_name,
                      pu.name AS patient_name, pu.email AS patient_email,
                      du.name AS doctor_name
               FROM appointments a
               LEFT JOIN patients p ON p.user_id = a.patient_id
               LEFT JOIN "user" pu ON pu.id = a.patient_id
               LEFT JOIN "user" du ON du.id = a.doctor_id
               WHERE a.status = 'scheduled' AND a.datetime >= $1 AND a.datetime < $2
               ORDER BY a.datetime"#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut queued = 0;
        for row in &rows {
            let Some(email) = row.patient_email.as_deref() else {
                continue;
            };

            let data = AppointmentEmail::new(
                build_person_name(
                    row.patient_first_name.as_deref(),
                    row.patient_last_name.as_deref(),
                    row.patient_name.as_deref(),
                    DEFAULT_PATIENT_NAME,
                ),
                build_person_name(None, None, row.doctor_name.as_deref(), DEFAULT_DOCTOR_NAME),
                format_pl_datetime(row.datetime),
                row.is_online,
                row.kind,
            );

            self.notifier
                .send(email, SUBJECT_REMINDER, templates::appointment_reminder(&data))
                .await?;
            queued += 1;
            info!("Queued reminder for appointment {}", row.appointment_id);
        }

        Ok(ReminderSummary {
            result: "Success".to_string(),
            queued,
            total: rows.len(),
        })
    }

    /// Runs the reminder once a day at `hour` clinic time.
    pub fn spawn_daily(self, hour: u32, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let wait = next_run_after(now, hour)
                    .map(|at| at - now)
                    .and_then(|d| d.to_std().ok())
                    .unwrap_or(std::time::Duration::from_secs(3600));
                info!("Next visit reminder run in {}s", wait.as_secs());

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown.changed() => break,
                }

                match self.run().await {
                    Ok(summary) => info!(
                        "Visit reminders queued: {}/{}",
                        summary.queued, summary.total
                    ),
                    Err(e) => error!("Visit reminder run failed: {}", e),
                }
            }
        })
    }
}

/// First instant strictly after `now` at `hour:00` clinic time.
pub fn next_run_after(now: DateTime<Utc>, hour: u32) -> Option<DateTime<Utc>> {
    let today = to_local(now).date_naive();
    let candidate = local_datetime(today, hour.min(23) * 60)?;
    if candidate > now {
        return Some(candidate);
    }
    let tomorrow = (to_local(now) + Duration::days(1)).date_naive();
    local_datetime(tomorrow, hour.min(23) * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn runs_later_today_before_the_hour() {
        // 05:00 in Warsaw (summer time)
        let now = Utc.with_ymd_and_hms(2025, 7, 15, 3, 0, 0).unwrap();
        let next = next_run_after(now, 7).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 7, 15, 5, 0, 0).unwrap());
    }

    #[test]
    fn runs_tomorrow_after_the_hour() {
        // 12:00 in Warsaw (winter time)
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 11, 0, 0).unwrap();
        let next = next_run_after(now, 7).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 16, 6, 0, 0).unwrap());
    }
}
