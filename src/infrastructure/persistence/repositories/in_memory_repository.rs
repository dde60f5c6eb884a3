use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::application::ports::{JobRepository, RepositoryError, RowErrorRepository};
use crate::domain::{Job, JobCompletion, JobId, JobRowError, JobStatus};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn missing(id: JobId) -> RepositoryError {
    RepositoryError::NotFound(format!("job {}", id))
}

/// Process-local job store for `database.backend = "in_memory"` and tests.
/// Follows the same guard rules as the Postgres adapter: once `finished_at`
/// is set, status and progress writes are ignored.
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let mut jobs = lock(&self.jobs);
        if jobs.contains_key(&job.id) {
            return Err(RepositoryError::QueryFailed(format!(
                "job {} already exists",
                job.id
            )));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(lock(&self.jobs).get(&id).cloned())
    }

    async fn update_status(&self, id: JobId, status: JobStatus) -> Result<(), RepositoryError> {
        let mut jobs = lock(&self.jobs);
        let job = jobs.get_mut(&id).ok_or_else(|| missing(id))?;
        if job.finished_at.is_none() {
            job.status = status;
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_total_rows(&self, id: JobId, total_rows: u64) -> Result<(), RepositoryError> {
        let mut jobs = lock(&self.jobs);
        let job = jobs.get_mut(&id).ok_or_else(|| missing(id))?;
        job.total_rows = Some(total_rows);
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn update_progress(
        &self,
        id: JobId,
        processed_rows: u64,
        error_rows: u64,
    ) -> Result<(), RepositoryError> {
        let mut jobs = lock(&self.jobs);
        let job = jobs.get_mut(&id).ok_or_else(|| missing(id))?;
        if job.finished_at.is_none() {
            job.processed_rows = processed_rows;
            job.error_rows = error_rows;
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn finalize(
        &self,
        id: JobId,
        completion: &JobCompletion,
    ) -> Result<bool, RepositoryError> {
        let mut jobs = lock(&self.jobs);
        let job = jobs.get_mut(&id).ok_or_else(|| missing(id))?;
        if job.finished_at.is_some() {
            return Ok(false);
        }

        let counters = completion.counters;
        job.status = completion.status;
        job.total_rows = counters.total.or(job.total_rows);
        job.processed_rows = counters.processed;
        job.error_rows = counters.errors;
        job.error_message = completion.error_message.clone();
        job.finished_at = Some(completion.finished_at);
        job.updated_at = completion.finished_at;
        Ok(true)
    }

    async fn delete(&self, id: JobId) -> Result<(), RepositoryError> {
        lock(&self.jobs).remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRowErrorRepository {
    errors: Mutex<Vec<JobRowError>>,
}

impl InMemoryRowErrorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_for(&self, job_id: JobId) -> usize {
        lock(&self.errors)
            .iter()
            .filter(|e| e.job_id == job_id)
            .count()
    }
}

#[async_trait::async_trait]
impl RowErrorRepository for InMemoryRowErrorRepository {
    async fn append(&self, error: &JobRowError) -> Result<(), RepositoryError> {
        lock(&self.errors).push(error.clone());
        Ok(())
    }

    async fn list_by_job(
        &self,
        job_id: JobId,
        limit: usize,
    ) -> Result<Vec<JobRowError>, RepositoryError> {
        let mut matching: Vec<JobRowError> = lock(&self.errors)
            .iter()
            .filter(|e| e.job_id == job_id)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.line_number);
        matching.truncate(limit);
        Ok(matching)
    }
}
