use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailQueueError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Redis connection error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    PoolError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<EmailQueueError> for shared_models::AppError {
    fn from(err: EmailQueueError) -> Self {
        match err {
            EmailQueueError::JobNotFound(id) => {
                shared_models::AppError::NotFound(format!("Nie znaleziono zadania {}", id))
            }
            other => shared_models::AppError::ExternalService(other.to_string()),
        }
    }
}
