use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SEND_EMAIL_QUEUE: &str = "send-email";
pub const MAX_ATTEMPTS: u32 = 3;
pub const BACKOFF_BASE_MS: i64 = 30_000;
/// How long a job may sit in the processing list before it counts as stalled.
pub const ACTIVE_LEASE_MS: i64 = 300_000;
pub const STALLED_REASON: &str = "Job stalled while processing";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendEmailJob {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailResult {
    pub message_id: String,
    pub response: String,
    pub sent_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Waiting,
    Active,
    Delayed,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, target: &JobStatus) -> bool {
        use JobStatus::*;
        match (self, target) {
            (Waiting, Active) => true,
            (Active, Completed) => true,
            (Active, Delayed) => true,
            (Active, Failed) => true,
            (Delayed, Waiting) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Active => "active",
            JobStatus::Delayed => "delayed",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailJob {
    pub id: Uuid,
    pub name: String,
    pub data: SendEmailJob,
    pub status: JobStatus,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failed_reason: Option<String>,
    pub result: Option<SendEmailResult>,
}

impl EmailJob {
    pub fn new(data: SendEmailJob) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: SEND_EMAIL_QUEUE.to_string(),
            data,
            status: JobStatus::Waiting,
            attempts_made: 0,
            max_attempts: MAX_ATTEMPTS,
            created_at: now,
            updated_at: now,
            processed_at: None,
            finished_at: None,
            failed_reason: None,
            result: None,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.attempts_made < self.max_attempts
    }

    /// True once a job found in the processing list has outlived its lease.
    /// Active jobs count from `processed_at`, anything else from its last update.
    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        let since = match self.status {
            JobStatus::Active => self.processed_at.unwrap_or(self.updated_at),
            _ => self.updated_at,
        };
        (now - since).num_milliseconds() > ACTIVE_LEASE_MS
    }
}

/// Exponential backoff: 30s after the first failure, then 60s, 120s...
pub fn backoff_delay_ms(attempts_made: u32) -> i64 {
    let exponent = attempts_made.saturating_sub(1).min(16);
    BACKOFF_BASE_MS * (1_i64 << exponent)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub waiting: u64,
    pub active: u64,
    pub delayed: u64,
    pub completed: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        assert!(JobStatus::Waiting.can_transition_to(&JobStatus::Active));
        assert!(JobStatus::Active.can_transition_to(&JobStatus::Delayed));
        assert!(JobStatus::Delayed.can_transition_to(&JobStatus::Waiting));
        assert!(!JobStatus::Completed.can_transition_to(&JobStatus::Active));
        assert!(!JobStatus::Waiting.can_transition_to(&JobStatus::Completed));
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn backoff_doubles_from_thirty_seconds() {
        assert_eq!(backoff_delay_ms(1), 30_000);
        assert_eq!(backoff_delay_ms(2), 60_000);
        assert_eq!(backoff_delay_ms(3), 120_000);
    }

    #[test]
    fn new_job_allows_three_attempts() {
        let mut job = EmailJob::new(SendEmailJob {
            to: "jan@example.com".to_string(),
            subject: "Test".to_string(),
            html: "<p>Test</p>".to_string(),
        });
        assert_eq!(job.status, JobStatus::Waiting);
        job.attempts_made = 2;
        assert!(job.can_retry());
        job.attempts_made = 3;
        assert!(!job.can_retry());
    }

    #[test]
    fn active_job_is_stalled_only_after_its_lease() {
        let mut job = EmailJob::new(SendEmailJob {
            to: "jan@example.com".to_string(),
            subject: "Test".to_string(),
            html: "<p>Test</p>".to_string(),
        });
        let started = Utc::now();
        job.status = JobStatus::Active;
        job.processed_at = Some(started);

        assert!(!job.lease_expired(started + chrono::Duration::seconds(60)));
        assert!(!job.lease_expired(started + chrono::Duration::milliseconds(ACTIVE_LEASE_MS)));
        assert!(job.lease_expired(started + chrono::Duration::milliseconds(ACTIVE_LEASE_MS + 1)));
    }

    #[test]
    fn job_never_marked_active_uses_its_last_update() {
        let mut job = EmailJob::new(SendEmailJob {
            to: "jan@example.com".to_string(),
            subject: "Test".to_string(),
            html: "<p>Test</p>".to_string(),
        });
        job.processed_at = None;
        let later = job.updated_at + chrono::Duration::minutes(10);
        assert!(job.lease_expired(later));
        assert!(!job.lease_expired(job.updated_at));
    }

    #[test]
    fn result_serializes_camel_case() {
        let result = SendEmailResult {
            message_id: "<abc@mail>".to_string(),
            response: "250 OK".to_string(),
            sent_at: 1,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["messageId"], "<abc@mail>");
        assert_eq!(value["sentAt"], 1);
    }
}
