use chrono::{DateTime, Utc};

use super::{JobId, JobStatus, SourcePath};

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub filename: String,
    pub filepath: SourcePath,
    pub status: JobStatus,
    pub total_rows: Option<u64>,
    pub processed_rows: u64,
    pub error_rows: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(filename: String, filepath: SourcePath) -> Self {
        Self::with_id(JobId::new(), filename, filepath)
    }

    pub fn with_id(id: JobId, filename: String, filepath: SourcePath) -> Self {
        let now = Utc::now();
        Self {
            id,
            filename,
            filepath,
            status: JobStatus::Pending,
            total_rows: None,
            processed_rows: 0,
            error_rows: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    pub fn counters(&self) -> JobCounters {
        JobCounters {
            total: self.total_rows,
            processed: self.processed_rows,
            errors: self.error_rows,
        }
    }
}

/// Row accounting for one job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobCounters {
    pub total: Option<u64>,
    pub processed: u64,
    pub errors: u64,
}

impl JobCounters {
    pub fn accounted(&self) -> u64 {
        self.processed + self.errors
    }
}

/// Everything written when a job reaches a terminal status.
#[derive(Debug, Clone, PartialEq)]
pub struct JobCompletion {
    pub status: JobStatus,
    pub counters: JobCounters,
    pub error_message: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl JobCompletion {
    pub fn new(status: JobStatus, counters: JobCounters, error_message: Option<String>) -> Self {
        Self {
            status,
            counters,
            error_message,
            finished_at: Utc::now(),
        }
    }
}
