use async_trait::async_trait;

use crate::domain::{JobId, JobRowError};

use super::RepositoryError;

#[async_trait]
pub trait RowErrorRepository: Send + Sync {
    async fn append(&self, error: &JobRowError) -> Result<(), RepositoryError>;

    /// Errors recorded for a job, ordered by line number.
    async fn list_by_job(
        &self,
        job_id: JobId,
        limit: usize,
    ) -> Result<Vec<JobRowError>, RepositoryError>;
}
