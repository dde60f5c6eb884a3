use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{Job, JobCompletion, JobId, JobStatus, SourcePath, StatusVocabulary};

use super::{from_db_count, to_db_count};

pub struct PgJobRepository {
    pool: PgPool,
    vocabulary: StatusVocabulary,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            vocabulary: StatusVocabulary::default(),
        }
    }

    pub fn with_vocabulary(mut self, vocabulary: StatusVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    filename: String,
    filepath: String,
    status: String,
    total_rows: Option<i64>,
    processed_rows: i64,
    error_rows: i64,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = RepositoryError;

    fn try_from(r: JobRow) -> Result<Self, Self::Error> {
        let status = r
            .status
            .parse::<JobStatus>()
            .map_err(RepositoryError::InvalidData)?;

        Ok(Job {
            id: JobId::from_uuid(r.id),
            filename: r.filename,
            filepath: SourcePath::from_raw(r.filepath),
            status,
            total_rows: r.total_rows.map(from_db_count),
            processed_rows: from_db_count(r.processed_rows),
            error_rows: from_db_count(r.error_rows),
            error_message: r.error_message,
            created_at: r.created_at,
            updated_at: r.updated_at,
            finished_at: r.finished_at,
        })
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, filename, filepath, status, total_rows, processed_rows,
                              error_rows, error_message, created_at, updated_at, finished_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(&job.filename)
        .bind(job.filepath.to_string_lossy())
        .bind(job.status.label(self.vocabulary))
        .bind(job.total_rows.map(to_db_count))
        .bind(to_db_count(job.processed_rows))
        .bind(to_db_count(job.error_rows))
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.finished_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, filename, filepath, status, total_rows, processed_rows, error_rows,
                   error_message, created_at, updated_at, finished_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.map(Job::try_from).transpose()
    }

    #[instrument(skip(self), fields(job_id = %id, status = %status))]
    async fn update_status(&self, id: JobId, status: JobStatus) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, updated_at = $2
            WHERE id = $3 AND finished_at IS NULL
            "#,
        )
        .bind(status.label(self.vocabulary))
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn set_total_rows(&self, id: JobId, total_rows: u64) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE jobs SET total_rows = $1, updated_at = $2 WHERE id = $3")
            .bind(to_db_count(total_rows))
            .bind(Utc::now())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn update_progress(
        &self,
        id: JobId,
        processed_rows: u64,
        error_rows: u64,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE jobs
            SET processed_rows = $1, error_rows = $2, updated_at = $3
            WHERE id = $4 AND finished_at IS NULL
            "#,
        )
        .bind(to_db_count(processed_rows))
        .bind(to_db_count(error_rows))
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self, completion), fields(job_id = %id, status = %completion.status))]
    async fn finalize(
        &self,
        id: JobId,
        completion: &JobCompletion,
    ) -> Result<bool, RepositoryError> {
        let counters = completion.counters;
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1,
                total_rows = COALESCE($2, total_rows),
                processed_rows = $3,
                error_rows = $4,
                error_message = $5,
                finished_at = $6,
                updated_at = $6
            WHERE id = $7 AND finished_at IS NULL
            "#,
        )
        .bind(completion.status.label(self.vocabulary))
        .bind(counters.total.map(to_db_count))
        .bind(to_db_count(counters.processed))
        .bind(to_db_count(counters.errors))
        .bind(&completion.error_message)
        .bind(completion.finished_at)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn delete(&self, id: JobId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}
