use async_trait::async_trait;

use crate::domain::Row;

/// Domain-specific processing applied to every parsed row.
///
/// An `Err` marks the row as failed; it never fails the job.
#[async_trait]
pub trait RowHook: Send + Sync {
    async fn process(&self, row: &Row) -> Result<(), RowHookError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RowHookError {
    #[error("{0}")]
    Rejected(String),
    #[error("row processing failed: {0}")]
    Failed(String),
}
