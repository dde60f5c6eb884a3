use std::io;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::domain::SourcePath;

/// Where uploaded files are written before a worker streams them.
#[async_trait::async_trait]
pub trait UploadStore: Send + Sync {
    /// Writes the stream to `path` chunk by chunk and returns the byte count.
    async fn store(
        &self,
        path: &SourcePath,
        stream: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<u64, UploadStoreError>;

    async fn delete(&self, path: &SourcePath) -> Result<(), UploadStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum UploadStoreError {
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
