use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::domain::{Job, JobId, JobRowError, StatusVocabulary};
use crate::presentation::state::AppState;

use super::error_response::error_response;

const DEFAULT_ERROR_LIMIT: usize = 100;
const MAX_ERROR_LIMIT: usize = 1000;

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub id: String,
    pub filename: String,
    pub status: String,
    pub total_rows: Option<u64>,
    pub processed_rows: u64,
    pub error_rows: u64,
    pub percent: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub finished_at: Option<String>,
}

impl JobStatusResponse {
    fn from_job(job: Job, vocabulary: StatusVocabulary) -> Self {
        let percent = job.total_rows.map(|total| {
            if total == 0 {
                100.0
            } else {
                let done = (job.processed_rows + job.error_rows) as f64 * 100.0 / total as f64;
                (done * 10.0).round() / 10.0
            }
        });

        Self {
            id: job.id.to_string(),
            filename: job.filename,
            status: job.status.label(vocabulary).to_string(),
            total_rows: job.total_rows,
            processed_rows: job.processed_rows,
            error_rows: job.error_rows,
            percent,
            error_message: job.error_message,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
            finished_at: job.finished_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
pub struct RowErrorResponse {
    pub line_number: u64,
    pub error_message: String,
    pub raw_row: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<JobRowError> for RowErrorResponse {
    fn from(e: JobRowError) -> Self {
        Self {
            line_number: e.line_number,
            error_message: e.error_message,
            raw_row: e.raw_row,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct JobErrorsResponse {
    pub job_id: String,
    pub errors: Vec<RowErrorResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorsQuery {
    pub limit: Option<usize>,
}

fn parse_job_id(raw: &str) -> Result<JobId, Response> {
    raw.parse::<JobId>().map_err(|_| {
        error_response(StatusCode::BAD_REQUEST, format!("Invalid job ID: {}", raw))
    })
}

async fn load_job(state: &AppState, job_id: JobId) -> Result<Job, Response> {
    match state.job_repository.get_by_id(job_id).await {
        Ok(Some(job)) => Ok(job),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Job not found: {}", job_id),
        )),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch job");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch job: {}", e),
            ))
        }
    }
}

#[tracing::instrument(skip(state))]
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match load_job(&state, job_id).await {
        Ok(job) => (
            StatusCode::OK,
            Json(JobStatusResponse::from_job(job, state.vocabulary)),
        )
            .into_response(),
        Err(response) => response,
    }
}

#[tracing::instrument(skip(state))]
pub async fn job_errors_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<ErrorsQuery>,
) -> Response {
    let job_id = match parse_job_id(&job_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if let Err(response) = load_job(&state, job_id).await {
        return response;
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_ERROR_LIMIT)
        .clamp(1, MAX_ERROR_LIMIT);

    match state.row_error_repository.list_by_job(job_id, limit).await {
        Ok(errors) => (
            StatusCode::OK,
            Json(JobErrorsResponse {
                job_id: job_id.to_string(),
                errors: errors.into_iter().map(RowErrorResponse::from).collect(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list row errors");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to list row errors: {}", e),
            )
        }
    }
}
