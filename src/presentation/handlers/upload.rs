use std::io;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::{StreamExt, TryStreamExt};
use serde::Serialize;

use crate::application::services::DispatchError;
use crate::domain::{Job, JobId, SourcePath};
use crate::presentation::state::AppState;

use super::error_response::error_response;

const FILE_FIELD: &str = "file";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub job_id: String,
    pub status: String,
    pub message: String,
}

/// Streams the uploaded CSV to disk, creates a `PENDING` job and queues it.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(f)) if f.name() == Some(FILE_FIELD) || f.file_name().is_some() => break f,
            Ok(Some(_)) => continue,
            Ok(None) => {
                tracing::warn!("Upload request with no file");
                return error_response(StatusCode::BAD_REQUEST, "No file uploaded");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read multipart");
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read multipart: {}", e),
                );
            }
        }
    };

    let filename = field.file_name().unwrap_or("upload.csv").to_string();
    let job_id = JobId::new();
    let filepath = SourcePath::for_upload(&state.upload_dir, &job_id);

    let body = field
        .map_err(|e| io::Error::other(e.to_string()))
        .boxed();
    let bytes = match state.upload_store.store(&filepath, body).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, filename = %filename, "Failed to store upload");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to store upload: {}", e),
            );
        }
    };
    tracing::debug!(job_id = %job_id, bytes, filename = %filename, "Upload stored");

    let job = Job::with_id(job_id, filename, filepath.clone());
    match state.dispatcher.dispatch(job).await {
        Ok(job) => (
            StatusCode::ACCEPTED,
            Json(UploadResponse {
                job_id: job.id.to_string(),
                status: job.status.label(state.vocabulary).to_string(),
                message: "File accepted for processing".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            if let Err(cleanup) = state.upload_store.delete(&filepath).await {
                tracing::warn!(error = %cleanup, "Failed to remove upload after dispatch failure");
            }
            let status = match e {
                DispatchError::CreateJob(_) => StatusCode::INTERNAL_SERVER_ERROR,
                DispatchError::Publish(_) => StatusCode::SERVICE_UNAVAILABLE,
            };
            error_response(status, format!("Failed to dispatch job: {}", e))
        }
    }
}
