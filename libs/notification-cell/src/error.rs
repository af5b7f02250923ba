use thiserror::Error;

use shared_database::EmailQueueError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),

    #[error("Queue error: {0}")]
    Queue(#[from] EmailQueueError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::Queue(e) => AppError::from(e),
            NotificationError::Database(e) => AppError::from(e),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}
