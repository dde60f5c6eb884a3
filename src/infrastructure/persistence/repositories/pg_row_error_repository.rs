use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{RepositoryError, RowErrorRepository};
use crate::domain::{JobId, JobRowError};

use super::{from_db_count, to_db_count};

pub struct PgRowErrorRepository {
    pool: PgPool,
}

impl PgRowErrorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RowErrorRow {
    job_id: Uuid,
    line_number: i64,
    error_message: String,
    raw_row: Option<Json<Value>>,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl RowErrorRepository for PgRowErrorRepository {
    #[instrument(skip(self, error), fields(job_id = %error.job_id, line_number = error.line_number))]
    async fn append(&self, error: &JobRowError) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO job_row_errors (job_id, line_number, error_message, raw_row, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(error.job_id.as_uuid())
        .bind(to_db_count(error.line_number))
        .bind(&error.error_message)
        .bind(error.raw_row.as_ref().map(Json))
        .bind(error.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn list_by_job(
        &self,
        job_id: JobId,
        limit: usize,
    ) -> Result<Vec<JobRowError>, RepositoryError> {
        let rows = sqlx::query_as::<_, RowErrorRow>(
            r#"
            SELECT job_id, line_number, error_message, raw_row, created_at
            FROM job_row_errors
            WHERE job_id = $1
            ORDER BY line_number, id
            LIMIT $2
            "#,
        )
        .bind(job_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| JobRowError {
                job_id: JobId::from_uuid(r.job_id),
                line_number: from_db_count(r.line_number),
                error_message: r.error_message,
                raw_row: r.raw_row.map(|Json(value)| value),
                created_at: r.created_at,
            })
            .collect())
    }
}
