use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use shared_database::{EmailJob, EmailQueue, JobStatus, SendEmailResult};

use crate::error::NotificationError;
use crate::models::WorkerConfig;
use crate::services::mailer::MailTransport;

/// Consumer side of the `send-email` queue.
pub struct EmailWorkerService {
    config: WorkerConfig,
    queue: EmailQueue,
    transport: Arc<dyn MailTransport>,
}

impl EmailWorkerService {
    pub fn new(config: WorkerConfig, queue: EmailQueue, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            config,
            queue,
            transport,
        }
    }

    /// Spawns `concurrency` consumers plus the stalled job check, all running until `shutdown` flips to true.
    #[instrument(skip(self, shutdown), fields(worker_id = %self.config.worker_id))]
    pub fn start(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let concurrency = self.config.concurrency.max(1);
        info!("Starting {} email consumers on queue {}", concurrency, self.queue.name());

        let mut handles: Vec<JoinHandle<()>> = (0..concurrency)
            .map(|i| {
                let worker = Arc::clone(&self);
                let shutdown = shutdown.clone();
                let name = format!("{}-{}", self.config.worker_id, i);
                tokio::spawn(async move { worker.worker_loop(name, shutdown).await })
            })
            .collect();

        let worker = Arc::clone(&self);
        handles.push(tokio::spawn(async move { worker.stalled_loop(shutdown).await }));
        handles
    }

    /// Periodically returns jobs abandoned in the processing list to the queue.
    async fn stalled_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.stalled_check_secs.max(1));

        while !*shutdown.borrow() {
            match self.queue.recover_stalled().await {
                Ok(0) => {}
                Ok(n) => info!("Recovered {} stalled email jobs", n),
                Err(e) => warn!("Stalled job check failed: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => break,
            }
        }
    }

    async fn worker_loop(&self, worker_name: String, shutdown: watch::Receiver<bool>) {
        debug!("Worker loop started: {}", worker_name);

        while !*shutdown.borrow() {
            if let Err(e) = self.queue.promote_due().await {
                warn!("Worker {} failed to promote delayed jobs: {}", worker_name, e);
            }

            match self.queue.dequeue().await {
                Ok(Some(job)) => {
                    if let Err(e) = self.process_job(job).await {
                        error!("Worker {} failed to record job outcome: {}", worker_name, e);
                    }
                }
                Ok(None) => {
                    tokio::time::sleep(Duration::from_millis(self.config.idle_backoff_ms)).await;
                }
                Err(e) => {
                    error!("Worker {} failed to dequeue job: {}", worker_name, e);
                    tokio::time::sleep(Duration::from_secs(self.config.error_backoff_secs)).await;
                }
            }
        }

        debug!("Worker loop ended: {}", worker_name);
    }

    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn process_job(&self, mut job: EmailJob) -> Result<JobStatus, NotificationError> {
        match deliver(self.transport.as_ref(), &job).await {
            Ok(result) => {
                self.queue.complete(&mut job, result).await?;
                Ok(JobStatus::Completed)
            }
            Err(e) => Ok(self.queue.fail(&mut job, &e.to_string()).await?),
        }
    }
}

pub async fn deliver(
    transport: &dyn MailTransport,
    job: &EmailJob,
) -> Result<SendEmailResult, NotificationError> {
    debug!(
        "Delivering email job {} (attempt {}/{})",
        job.id,
        job.attempts_made + 1,
        job.max_attempts
    );
    transport.send(&job.data).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mailer::MockMailTransport;
    use assert_matches::assert_matches;
    use shared_database::SendEmailJob;

    fn job() -> EmailJob {
        EmailJob::new(SendEmailJob {
            to: "jan@example.com".into(),
            subject: "Przypomnienie o wizycie".into(),
            html: "<p>Hej</p>".into(),
        })
    }

    #[tokio::test]
    async fn deliver_returns_transport_result() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .withf(|email| email.to == "jan@example.com")
            .times(1)
            .returning(|_| {
                Ok(SendEmailResult {
                    message_id: "<1@przychodnia>".into(),
                    response: "250 OK".into(),
                    sent_at: 1,
                })
            });

        let result = deliver(&transport, &job()).await.unwrap();
        assert_eq!(result.response, "250 OK");
    }

    #[tokio::test]
    async fn deliver_propagates_transport_errors() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .returning(|_| Err(NotificationError::Build("boom".into())));

        let err = deliver(&transport, &job()).await.unwrap_err();
        assert_matches!(err, NotificationError::Build(_));
    }
}
