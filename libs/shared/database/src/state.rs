use std::sync::Arc;

use sqlx::PgPool;

use shared_config::AppConfig;

use crate::queue::EmailQueue;

/// Shared handles injected into every router.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: PgPool,
    pub email_queue: EmailQueue,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: PgPool, email_queue: EmailQueue) -> Self {
        Self {
            config,
            db,
            email_queue,
        }
    }
}
