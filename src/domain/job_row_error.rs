use chrono::{DateTime, Utc};
use serde_json::Value;

use super::JobId;

/// Durable record of a single row that failed processing. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRowError {
    pub job_id: JobId,
    pub line_number: u64,
    pub error_message: String,
    pub raw_row: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl JobRowError {
    pub fn new(
        job_id: JobId,
        line_number: u64,
        error_message: impl Into<String>,
        raw_row: Option<Value>,
    ) -> Self {
        Self {
            job_id,
            line_number,
            error_message: error_message.into(),
            raw_row,
            created_at: Utc::now(),
        }
    }
}
