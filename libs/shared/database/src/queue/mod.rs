pub mod email_queue;
pub mod error;
pub mod models;

pub use email_queue::EmailQueue;
pub use error::EmailQueueError;
pub use models::{
    backoff_delay_ms, EmailJob, JobStatus, QueueCounts, SendEmailJob, SendEmailResult,
    BACKOFF_BASE_MS, MAX_ATTEMPTS, SEND_EMAIL_QUEUE,
};
