use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

use crate::application::ports::{UploadStore, UploadStoreError};
use crate::domain::SourcePath;

/// Writes uploads into a directory on the local filesystem.
///
/// Bytes land in a `.part` file that is renamed into place only after the
/// whole stream was written, so a worker never sees a half-written file.
pub struct LocalUploadStore {
    base_dir: PathBuf,
}

impl LocalUploadStore {
    pub fn new(base_dir: PathBuf) -> Result<Self, UploadStoreError> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &std::path::Path {
        &self.base_dir
    }
}

fn partial_path(path: &SourcePath) -> PathBuf {
    let mut partial = path.as_path().as_os_str().to_owned();
    partial.push(".part");
    PathBuf::from(partial)
}

#[async_trait::async_trait]
impl UploadStore for LocalUploadStore {
    #[instrument(skip(self, stream), fields(path = %path))]
    async fn store(
        &self,
        path: &SourcePath,
        mut stream: BoxStream<'_, Result<Bytes, io::Error>>,
    ) -> Result<u64, UploadStoreError> {
        if let Some(parent) = path.as_path().parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(path);
        let mut file = File::create(&partial).await?;
        let mut total_bytes: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let written = match chunk {
                Ok(bytes) => file.write_all(&bytes).await.map(|_| bytes.len() as u64),
                Err(e) => Err(e),
            };
            match written {
                Ok(len) => total_bytes += len,
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(&partial).await;
                    return Err(UploadStoreError::Io(e));
                }
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&partial, path.as_path())
            .await
            .map_err(|e| UploadStoreError::UploadFailed(e.to_string()))?;

        tracing::debug!(bytes = total_bytes, "Upload stored");
        Ok(total_bytes)
    }

    async fn delete(&self, path: &SourcePath) -> Result<(), UploadStoreError> {
        match fs::remove_file(path.as_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UploadStoreError::DeleteFailed(e.to_string())),
        }
    }
}
