use crate::domain::{Job, JobCompletion, JobId, JobStatus};
use async_trait::async_trait;

use super::RepositoryError;

/// Store collaborator for `Job` records. Each call is an independent statement.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;

    async fn update_status(&self, id: JobId, status: JobStatus) -> Result<(), RepositoryError>;

    async fn set_total_rows(&self, id: JobId, total_rows: u64) -> Result<(), RepositoryError>;

    async fn update_progress(
        &self,
        id: JobId,
        processed_rows: u64,
        error_rows: u64,
    ) -> Result<(), RepositoryError>;

    /// Writes the terminal status, final counters and `finished_at`.
    ///
    /// Returns `false` when the job already had a `finished_at`, in which case
    /// nothing is written.
    async fn finalize(
        &self,
        id: JobId,
        completion: &JobCompletion,
    ) -> Result<bool, RepositoryError>;

    async fn delete(&self, id: JobId) -> Result<(), RepositoryError>;
}
