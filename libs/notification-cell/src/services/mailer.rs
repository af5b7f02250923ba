use async_trait::async_trait;
use chrono::Utc;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;
use uuid::Uuid;

use shared_config::SmtpConfig;
use shared_database::{SendEmailJob, SendEmailResult};

use crate::error::NotificationError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &SendEmailJob) -> Result<SendEmailResult, NotificationError>;
}

pub struct SmtpMailer {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// With credentials the relay is reached over STARTTLS; without them the
    /// host is treated as a plain local relay such as Mailpit.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        let transport = match (&config.user, &config.password) {
            (Some(user), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                    .port(config.port)
                    .credentials(Credentials::new(user.clone(), password.clone()))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build(),
        };

        Ok(Self {
            from_address: config.from_address.clone(),
            transport,
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &SendEmailJob) -> Result<SendEmailResult, NotificationError> {
        let message_id = format!("<{}@przychodnia>", Uuid::new_v4());

        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| NotificationError::Build(e.to_string()))?;

        let response = self.transport.send(message).await?;
        let text = response.message().collect::<Vec<_>>().join(" ");

        info!(to = %email.to, subject = %email.subject, "Email sent");

        Ok(SendEmailResult {
            message_id,
            response: format!("{} {}", response.code(), text).trim().to_string(),
            sent_at: Utc::now().timestamp_millis(),
        })
    }
}
