use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{EmailQueue, SendEmailJob};

use crate::error::NotificationError;
use crate::models::{AppointmentEmail, SUBJECT_SET_PASSWORD, SUBJECT_VERIFY_EMAIL};
use crate::templates;

/// Producer side of the `send-email` queue.
#[derive(Clone)]
pub struct Notifier {
    queue: EmailQueue,
}

impl Notifier {
    pub fn new(queue: EmailQueue) -> Self {
        Self { queue }
    }

    pub async fn send(&self, to: &str, subject: &str, html: String) -> Result<Uuid, NotificationError> {
        let job_id = self
            .queue
            .enqueue(SendEmailJob {
                to: to.to_string(),
                subject: subject.to_string(),
                html,
            })
            .await?;
        debug!("Queued email '{}' to {} as job {}", subject, to, job_id);
        Ok(job_id)
    }

    pub async fn appointment_canceled(
        &self,
        to: &str,
        subject: &str,
        data: &AppointmentEmail,
    ) -> Result<Uuid, NotificationError> {
        self.send(to, subject, templates::appointment_canceled(data)).await
    }

    pub async fn verify_email(&self, to: &str, name: &str, link: &str) -> Result<Uuid, NotificationError> {
        self.send(to, SUBJECT_VERIFY_EMAIL, templates::verify_email(name, link)).await
    }

    pub async fn set_password(&self, to: &str, name: &str, link: &str) -> Result<Uuid, NotificationError> {
        self.send(to, SUBJECT_SET_PASSWORD, templates::set_password(name, link)).await
    }

    /// Fire-and-log variant for side effects that must not fail the request.
    pub async fn try_send(&self, to: &str, subject: &str, html: String) -> bool {
        match self.send(to, subject, html).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to queue email '{}' to {}: {}", subject, to, e);
                false
            }
        }
    }
}
