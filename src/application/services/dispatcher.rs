use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::application::ports::{JobQueue, JobRepository, QueueError, RepositoryError};
use crate::domain::{Job, JobCompletion, JobStatus, QueueMessage};

/// What happens to a freshly created job whose message could not be published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchCompensation {
    #[default]
    MarkFailed,
    Rollback,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub publish_attempts: u32,
    pub retry_backoff: Duration,
    pub compensation: DispatchCompensation,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            publish_attempts: 3,
            retry_backoff: Duration::from_millis(200),
            compensation: DispatchCompensation::MarkFailed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to create job: {0}")]
    CreateJob(RepositoryError),
    #[error("failed to publish job message: {0}")]
    Publish(QueueError),
}

/// Producer side: persists a `Pending` job and hands it to the queue.
pub struct Dispatcher {
    jobs: Arc<dyn JobRepository>,
    queue: Arc<dyn JobQueue>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        queue: Arc<dyn JobQueue>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            jobs,
            queue,
            config,
        }
    }

    #[tracing::instrument(skip(self, job), fields(job_id = %job.id, filename = %job.filename))]
    pub async fn dispatch(&self, job: Job) -> Result<Job, DispatchError> {
        self.jobs
            .create(&job)
            .await
            .map_err(DispatchError::CreateJob)?;

        let message = QueueMessage::new(job.id, job.filepath.clone());
        match self.publish_with_retry(&message).await {
            Ok(()) => {
                tracing::info!(filepath = %job.filepath, "Job dispatched");
                Ok(job)
            }
            Err(e) => {
                self.compensate(&job, &e).await;
                Err(DispatchError::Publish(e))
            }
        }
    }

    async fn publish_with_retry(&self, message: &QueueMessage) -> Result<(), QueueError> {
        let mut attempt = 1;
        let mut delay = self.config.retry_backoff;

        loop {
            match self.queue.publish(message).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.config.publish_attempts => {
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_attempts = self.config.publish_attempts,
                        delay_ms = delay.as_millis(),
                        "Publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn compensate(&self, job: &Job, error: &QueueError) {
        let result = match self.config.compensation {
            DispatchCompensation::MarkFailed => {
                let completion = JobCompletion::new(
                    JobStatus::Failed,
                    job.counters(),
                    Some(format!("dispatch failed: {}", error)),
                );
                self.jobs.finalize(job.id, &completion).await.map(|_| ())
            }
            DispatchCompensation::Rollback => self.jobs.delete(job.id).await,
        };

        match result {
            Ok(()) => tracing::warn!(
                compensation = ?self.config.compensation,
                error = %error,
                "Publish failed; job compensated"
            ),
            Err(e) => tracing::error!(
                compensation = ?self.config.compensation,
                error = %e,
                publish_error = %error,
                "Publish failed and compensation failed; job left PENDING"
            ),
        }
    }
}
