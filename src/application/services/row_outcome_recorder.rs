use std::sync::Arc;

use crate::application::ports::{RowErrorRepository, RowHook};
use crate::domain::{JobId, JobRowError, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Processed,
    Failed { diagnostic_persisted: bool },
}

impl RowOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RowOutcome::Failed { .. })
    }
}

/// Runs the row hook and writes a `JobRowError` for every row it rejects.
pub struct RowOutcomeRecorder {
    hook: Arc<dyn RowHook>,
    row_errors: Arc<dyn RowErrorRepository>,
    capture_raw_rows: bool,
}

impl RowOutcomeRecorder {
    pub fn new(hook: Arc<dyn RowHook>, row_errors: Arc<dyn RowErrorRepository>) -> Self {
        Self {
            hook,
            row_errors,
            capture_raw_rows: false,
        }
    }

    pub fn with_raw_rows(mut self, capture: bool) -> Self {
        self.capture_raw_rows = capture;
        self
    }

    pub async fn record(&self, job_id: JobId, line_number: u64, row: &Row) -> RowOutcome {
        match self.hook.process(row).await {
            Ok(()) => RowOutcome::Processed,
            Err(e) => {
                tracing::debug!(job_id = %job_id, line_number, error = %e, "Row rejected");
                let raw_row = self.capture_raw_rows.then(|| row.to_json());
                self.record_failure(job_id, line_number, e.to_string(), raw_row)
                    .await
            }
        }
    }

    /// Records a row the parser could not decode.
    pub async fn record_unreadable(
        &self,
        job_id: JobId,
        line_number: u64,
        message: String,
    ) -> RowOutcome {
        tracing::debug!(job_id = %job_id, line_number, error = %message, "Unreadable row");
        self.record_failure(job_id, line_number, message, None).await
    }

    async fn record_failure(
        &self,
        job_id: JobId,
        line_number: u64,
        message: String,
        raw_row: Option<serde_json::Value>,
    ) -> RowOutcome {
        let error = JobRowError::new(job_id, line_number, message, raw_row);
        match self.row_errors.append(&error).await {
            Ok(()) => RowOutcome::Failed {
                diagnostic_persisted: true,
            },
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    line_number,
                    error = %e,
                    "Failed to persist row error; continuing"
                );
                RowOutcome::Failed {
                    diagnostic_persisted: false,
                }
            }
        }
    }
}
