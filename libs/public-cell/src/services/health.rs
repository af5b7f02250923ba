use std::future::Future;
use std::time::{Duration, Instant};

use sqlx::PgPool;
use tracing::warn;

use shared_database::EmailQueue;

use crate::models::{ComponentHealth, HealthReport, HealthStatus};

const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

pub struct HealthService;

impl HealthService {
    pub async fn check(pool: &PgPool, queue: &EmailQueue) -> HealthReport {
        let (database, redis) = tokio::join!(
            Self::probe("database", async {
                sqlx::query_scalar::<_, i32>("SELECT 1")
                    .fetch_one(pool)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }),
            Self::probe("redis", async { queue.ping().await.map_err(|e| e.to_string()) }),
        );
        HealthReport::new(database, redis)
    }

    async fn probe<F>(component: &str, check: F) -> ComponentHealth
    where
        F: Future<Output = Result<(), String>>,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(CHECK_TIMEOUT, check).await {
            Ok(result) => result,
            Err(_) => Err(format!("timed out after {}s", CHECK_TIMEOUT.as_secs())),
        };
        let response_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => ComponentHealth {
                status: HealthStatus::Healthy,
                response_time_ms,
                error_message: None,
            },
            Err(error) => {
                warn!("Health check of {} failed: {}", component, error);
                ComponentHealth {
                    status: HealthStatus::Unhealthy,
                    response_time_ms,
                    error_message: Some(error),
                }
            }
        }
    }
}
