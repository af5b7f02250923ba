use sqlx::PgPool;
use tracing::debug;

use shared_database::EmailQueue;

use crate::models::{
    AdminError, AuditLogEntry, ClinicAppointment, ClinicAppointmentRow, ClinicPatient,
    ClinicPatientRow, ClinicStatistics, QueueCountsView, QueueJobView, QueueSummary,
    EMAIL_QUEUE_LABEL, QUEUE_JOB_LIMIT,
};

pub struct OverviewService;

impl OverviewService {
    /// Every appointment in the clinic, oldest first, with decrypted patient PESELs.
    pub async fn appointments(pool: &PgPool, pesel_key: &str) -> Result<Vec<ClinicAppointment>, AdminError> {
        let rows = sqlx::query_as::<_, ClinicAppointmentRow>(
            r#"SELECT a.appointment_id, a.datetime, a.status, a.notes,
                      a.patient_id, p.first_name AS patient_first_name,
                      p.last_name AS patient_last_name, p.pesel AS patient_pesel,
                      a.doctor_id, du.name AS doctor_name,
                      r.room_id, r.number AS room_number
               FROM appointments a
               LEFT JOIN patients p ON p.user_id = a.patient_id
               LEFT JOIN "user" du ON du.id = a.doctor_id
               LEFT JOIN room r ON r.room_id = a.room_room_id
               ORDER BY a.datetime ASC"#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.reveal(pesel_key)).collect())
    }

    pub async fn patients(pool: &PgPool, pesel_key: &str) -> Result<Vec<ClinicPatient>, AdminError> {
        let rows = sqlx::query_as::<_, ClinicPatientRow>(
            r#"SELECT p.user_id, p.first_name, p.last_name, p.pesel, p.phone, p.address,
                      u.email, u.created_at
               FROM patients p
               LEFT JOIN "user" u ON u.id = p.user_id
               ORDER BY p.last_name ASC"#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.reveal(pesel_key)).collect())
    }

    pub async fn logs(pool: &PgPool) -> Result<Vec<AuditLogEntry>, AdminError> {
        let logs = sqlx::query_as::<_, AuditLogEntry>(
            r#"SELECT l.log_id, l.action, l.timestamp, l.ip_address,
                      l.user_id, u.name AS user_name, u.email AS user_email
               FROM logs l
               LEFT JOIN "user" u ON u.id = l.user_id
               ORDER BY l.timestamp DESC"#,
        )
        .fetch_all(pool)
        .await?;
        Ok(logs)
    }

    pub async fn statistics(pool: &PgPool) -> Result<ClinicStatistics, AdminError> {
        let stats = sqlx::query_as::<_, ClinicStatistics>(
            r#"SELECT
                   (SELECT count(*) FROM "user" WHERE role = 'admin') AS total_admins,
                   (SELECT count(*) FROM doctors d
                      JOIN "user" u ON u.id = d.user_id
                     WHERE u.banned = FALSE) AS total_doctors,
                   (SELECT count(*) FROM patients) AS total_patients,
                   (SELECT count(*) FROM logs) AS total_logs"#,
        )
        .fetch_one(pool)
        .await?;
        Ok(stats)
    }

    /// Counters and the latest jobs of the outgoing email queue.
    pub async fn queues(queue: &EmailQueue) -> Result<Vec<QueueSummary>, AdminError> {
        let counts = queue.counts().await?;
        let jobs = queue.recent_jobs(QUEUE_JOB_LIMIT).await?;
        debug!("Email queue: {} waiting, {} failed", counts.waiting, counts.failed);

        Ok(vec![QueueSummary {
            name: queue.name().to_string(),
            label: EMAIL_QUEUE_LABEL.to_string(),
            counts: QueueCountsView {
                waiting: counts.waiting,
                active: counts.active,
                completed: counts.completed,
                failed: counts.failed,
                delayed: counts.delayed,
                paused: 0,
            },
            jobs: jobs.into_iter().map(QueueJobView::from).collect(),
        }])
    }
}
