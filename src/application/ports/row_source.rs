use std::io;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::{Row, SourcePath};

/// Lazy sequence of rows. Items are pulled one at a time; nothing is read
/// ahead of the consumer beyond the parser's own buffer.
pub type RowStream = BoxStream<'static, Result<Row, RowSourceError>>;

#[async_trait]
pub trait RowSource: Send + Sync {
    async fn exists(&self, path: &SourcePath) -> Result<bool, RowSourceError>;

    /// Fast estimate of the number of data rows, used only for progress reporting.
    async fn count_rows(&self, path: &SourcePath) -> Result<u64, RowSourceError>;

    async fn open(&self, path: &SourcePath) -> Result<RowStream, RowSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RowSourceError {
    #[error("source not found: {0}")]
    NotFound(String),
    /// A single record could not be decoded. The stream can continue.
    #[error("malformed row: {0}")]
    Malformed(String),
    /// The underlying byte source failed. The stream is over.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl RowSourceError {
    pub fn is_row_level(&self) -> bool {
        matches!(self, RowSourceError::Malformed(_))
    }
}
