use chrono::Utc;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::EmailQueueError;
use super::models::{
    backoff_delay_ms, EmailJob, JobStatus, QueueCounts, SendEmailJob, SendEmailResult,
    SEND_EMAIL_QUEUE, STALLED_REASON,
};

const PENDING_KEY: &str = "email_queue:pending";
const PROCESSING_KEY: &str = "email_queue:processing";
const DELAYED_KEY: &str = "email_queue:delayed";
const COMPLETED_KEY: &str = "email_queue:completed";
const FAILED_KEY: &str = "email_queue:failed";
const JOB_TTL_SECONDS: i64 = 604_800;
const HISTORY_LIMIT: isize = 1000;

/// Redis-backed `send-email` queue shared by producers and the worker.
#[derive(Clone)]
pub struct EmailQueue {
    pool: Pool,
}

impl EmailQueue {
    pub fn new(redis_url: &str) -> Result<Self, EmailQueueError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| EmailQueueError::PoolError(format!("Pool creation error: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn name(&self) -> &'static str {
        SEND_EMAIL_QUEUE
    }

    pub async fn ping(&self) -> Result<(), EmailQueueError> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    pub async fn enqueue(&self, data: SendEmailJob) -> Result<Uuid, EmailQueueError> {
        let job = EmailJob::new(data);
        let mut conn = self.get_connection().await?;

        self.store_job(&mut conn, &job).await?;
        let _: () = redis::cmd("EXPIRE")
            .arg(job_key(job.id))
            .arg(JOB_TTL_SECONDS)
            .query_async(&mut conn)
            .await?;
        let _: () = conn.lpush(PENDING_KEY, job.id.to_string()).await?;

        debug!("Email job {} enqueued for {}", job.id, job.data.to);
        Ok(job.id)
    }

    /// Blocks up to one second waiting for a job and marks it active.
    pub async fn dequeue(&self) -> Result<Option<EmailJob>, EmailQueueError> {
        let mut conn = self.get_connection().await?;

        let job_id: Option<String> = conn.brpoplpush(PENDING_KEY, PROCESSING_KEY, 1.0).await?;
        let Some(job_id) = job_id else {
            return Ok(None);
        };

        let data: Option<String> = conn.hget(format!("email_job:{}", job_id), "data").await?;
        let Some(data) = data else {
            warn!("Email job {} vanished before processing", job_id);
            let _: () = conn.lrem(PROCESSING_KEY, 1, &job_id).await?;
            return Ok(None);
        };

        let mut job: EmailJob = serde_json::from_str(&data)?;
        transition(&mut job, JobStatus::Active)?;
        job.processed_at = Some(Utc::now());
        self.store_job(&mut conn, &job).await?;

        debug!("Email job {} dequeued", job.id);
        Ok(Some(job))
    }

    pub async fn complete(
        &self,
        job: &mut EmailJob,
        result: SendEmailResult,
    ) -> Result<(), EmailQueueError> {
        let mut conn = self.get_connection().await?;

        transition(job, JobStatus::Completed)?;
        job.attempts_made += 1;
        job.finished_at = Some(Utc::now());
        job.result = Some(result);
        self.store_job(&mut conn, job).await?;

        let id = job.id.to_string();
        let _: () = conn.lrem(PROCESSING_KEY, 1, &id).await?;
        let _: () = conn.lpush(COMPLETED_KEY, &id).await?;
        let _: () = conn.ltrim(COMPLETED_KEY, 0, HISTORY_LIMIT - 1).await?;

        info!("Email job {} completed", job.id);
        Ok(())
    }

    /// Records a failed attempt; schedules a retry with backoff or marks the job failed.
    pub async fn fail(&self, job: &mut EmailJob, reason: &str) -> Result<JobStatus, EmailQueueError> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.lrem(PROCESSING_KEY, 1, job.id.to_string()).await?;
        self.record_failure(&mut conn, job, reason).await
    }

    /// Bumps the attempt count of a job already off the processing list and
    /// either delays it for a retry or moves it to the failed history.
    async fn record_failure(
        &self,
        conn: &mut Connection,
        job: &mut EmailJob,
        reason: &str,
    ) -> Result<JobStatus, EmailQueueError> {
        job.attempts_made += 1;
        job.failed_reason = Some(reason.to_string());
        let id = job.id.to_string();

        if job.can_retry() {
            transition(job, JobStatus::Delayed)?;
            let due = Utc::now().timestamp_millis() + backoff_delay_ms(job.attempts_made);
            self.store_job(conn, job).await?;
            let _: () = conn.zadd(DELAYED_KEY, &id, due).await?;
            warn!(
                "Email job {} failed (attempt {}/{}), retrying later: {}",
                job.id, job.attempts_made, job.max_attempts, reason
            );
        } else {
            transition(job, JobStatus::Failed)?;
            job.finished_at = Some(Utc::now());
            self.store_job(conn, job).await?;
            let _: () = conn.lpush(FAILED_KEY, &id).await?;
            let _: () = conn.ltrim(FAILED_KEY, 0, HISTORY_LIMIT - 1).await?;
            warn!("Email job {} failed permanently: {}", job.id, reason);
        }

        Ok(job.status)
    }

    /// Moves delayed jobs whose backoff has elapsed back to the pending list.
    pub async fn promote_due(&self) -> Result<usize, EmailQueueError> {
        let mut conn = self.get_connection().await?;
        let now = Utc::now().timestamp_millis();

        let due: Vec<String> = conn.zrangebyscore(DELAYED_KEY, 0, now).await?;
        let mut promoted = 0;

        for id in due {
            let removed: usize = conn.zrem(DELAYED_KEY, &id).await?;
            if removed == 0 {
                continue;
            }

            let data: Option<String> = conn.hget(format!("email_job:{}", id), "data").await?;
            if let Some(data) = data {
                let mut job: EmailJob = serde_json::from_str(&data)?;
                transition(&mut job, JobStatus::Waiting)?;
                self.store_job(&mut conn, &job).await?;
                let _: () = conn.lpush(PENDING_KEY, &id).await?;
                promoted += 1;
            }
        }

        if promoted > 0 {
            debug!("Promoted {} delayed email jobs", promoted);
        }
        Ok(promoted)
    }

    /// Takes jobs whose lease ran out off the processing list. Active ones count
    /// as a failed attempt; jobs that never became active go back to pending.
    pub async fn recover_stalled(&self) -> Result<usize, EmailQueueError> {
        let mut conn = self.get_connection().await?;
        let now = Utc::now();

        let ids: Vec<String> = conn.lrange(PROCESSING_KEY, 0, -1).await?;
        let mut recovered = 0;

        for id in ids {
            let data: Option<String> = conn.hget(format!("email_job:{}", id), "data").await?;
            let Some(data) = data else {
                let _: () = conn.lrem(PROCESSING_KEY, 1, &id).await?;
                continue;
            };

            let mut job: EmailJob = serde_json::from_str(&data)?;
            if !job.lease_expired(now) {
                continue;
            }
            let removed: usize = conn.lrem(PROCESSING_KEY, 1, &id).await?;
            if removed == 0 {
                continue;
            }

            match job.status {
                JobStatus::Active => {
                    self.record_failure(&mut conn, &mut job, STALLED_REASON).await?;
                }
                JobStatus::Waiting => {
                    let _: () = conn.rpush(PENDING_KEY, &id).await?;
                }
                JobStatus::Delayed => {
                    let _: () = conn.zadd(DELAYED_KEY, &id, now.timestamp_millis()).await?;
                }
                JobStatus::Completed | JobStatus::Failed => {}
            }
            warn!("Recovered stalled email job {} ({})", id, job.status.as_str());
            recovered += 1;
        }

        Ok(recovered)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<EmailJob>, EmailQueueError> {
        let mut conn = self.get_connection().await?;
        let data: Option<String> = conn.hget(job_key(job_id), "data").await?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub async fn counts(&self) -> Result<QueueCounts, EmailQueueError> {
        let mut conn = self.get_connection().await?;

        Ok(QueueCounts {
            waiting: conn.llen(PENDING_KEY).await?,
            active: conn.llen(PROCESSING_KEY).await?,
            delayed: conn.zcard(DELAYED_KEY).await?,
            completed: conn.llen(COMPLETED_KEY).await?,
            failed: conn.llen(FAILED_KEY).await?,
        })
    }

    /// Latest jobs across every state, newest first.
    pub async fn recent_jobs(&self, limit: usize) -> Result<Vec<EmailJob>, EmailQueueError> {
        let mut conn = self.get_connection().await?;
        let stop = limit as isize - 1;

        let mut ids: Vec<String> = Vec::new();
        for key in [PENDING_KEY, PROCESSING_KEY, COMPLETED_KEY, FAILED_KEY] {
            let chunk: Vec<String> = conn.lrange(key, 0, stop).await?;
            ids.extend(chunk);
        }
        let delayed: Vec<String> = conn.zrevrange(DELAYED_KEY, 0, stop).await?;
        ids.extend(delayed);

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            let data: Option<String> = conn.hget(format!("email_job:{}", id), "data").await?;
            if let Some(data) = data {
                jobs.push(serde_json::from_str::<EmailJob>(&data)?);
            }
        }

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.dedup_by_key(|job| job.id);
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn get_connection(&self) -> Result<Connection, EmailQueueError> {
        self.pool.get().await.map_err(|e| {
            EmailQueueError::RedisError(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "Failed to get Redis connection",
                e.to_string(),
            )))
        })
    }

    async fn store_job(&self, conn: &mut Connection, job: &EmailJob) -> Result<(), EmailQueueError> {
        let job_data = serde_json::to_string(job)?;
        let updated_at = job.updated_at.to_rfc3339();

        let _: () = conn
            .hset_multiple(
                job_key(job.id),
                &[
                    ("data", job_data.as_str()),
                    ("status", job.status.as_str()),
                    ("updated_at", updated_at.as_str()),
                ],
            )
            .await?;

        Ok(())
    }
}

fn job_key(id: Uuid) -> String {
    format!("email_job:{}", id)
}

fn transition(job: &mut EmailJob, target: JobStatus) -> Result<(), EmailQueueError> {
    if !job.status.can_transition_to(&target) {
        return Err(EmailQueueError::InvalidStatusTransition {
            from: job.status.as_str().to_string(),
            to: target.as_str().to_string(),
        });
    }
    job.status = target;
    job.updated_at = Utc::now();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn job() -> EmailJob {
        EmailJob::new(SendEmailJob {
            to: "anna@example.com".to_string(),
            subject: "Przypomnienie o wizycie".to_string(),
            html: "<p>Jutro</p>".to_string(),
        })
    }

    #[test]
    fn transition_rejects_skipping_active() {
        let mut job = job();
        let result = transition(&mut job, JobStatus::Completed);
        assert_matches!(result, Err(EmailQueueError::InvalidStatusTransition { .. }));
        assert_eq!(job.status, JobStatus::Waiting);
    }

    #[test]
    fn transition_updates_status() {
        let mut job = job();
        transition(&mut job, JobStatus::Active).unwrap();
        assert_eq!(job.status, JobStatus::Active);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at REDIS_URL"]
    async fn enqueue_and_dequeue_round_trip() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let queue = EmailQueue::new(&url).unwrap();
        queue.ping().await.unwrap();

        let id = queue.enqueue(job().data).await.unwrap();
        let stored = queue.get_job(id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Waiting);

        let counts = queue.counts().await.unwrap();
        assert!(counts.waiting >= 1);
    }
}
