use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use csv_async::{AsyncReaderBuilder, ErrorKind};
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::instrument;

use crate::application::ports::{RowSource, RowSourceError, RowStream};
use crate::domain::{Row, SourcePath};

const COUNT_BUFFER_SIZE: usize = 64 * 1024;

/// Reads header-first CSV files from the local filesystem.
///
/// Records are parsed lazily as the returned stream is polled. A record with
/// the wrong number of fields or invalid UTF-8 is yielded as
/// [`RowSourceError::Malformed`] and reading continues with the next one.
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    delimiter: u8,
}

impl Default for CsvRowSource {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    async fn open_file(path: &SourcePath) -> Result<File, RowSourceError> {
        File::open(path.as_path()).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RowSourceError::NotFound(path.to_string()),
            _ => RowSourceError::Io(e),
        })
    }
}

fn classify(err: csv_async::Error) -> RowSourceError {
    match err.into_kind() {
        ErrorKind::Io(e) => RowSourceError::Io(e),
        ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => RowSourceError::Malformed(format!(
            "expected {} fields, found {}",
            expected_len, len
        )),
        ErrorKind::Utf8 { err, .. } => {
            RowSourceError::Malformed(format!("invalid UTF-8 in field {}", err.field() + 1))
        }
        other => RowSourceError::Malformed(format!("{:?}", other)),
    }
}

#[async_trait]
impl RowSource for CsvRowSource {
    async fn exists(&self, path: &SourcePath) -> Result<bool, RowSourceError> {
        Ok(tokio::fs::try_exists(path.as_path()).await?)
    }

    /// Counts newline-terminated lines minus the header. Quoted fields that
    /// span lines make this an overestimate, which the tracker tolerates.
    #[instrument(skip(self), fields(path = %path))]
    async fn count_rows(&self, path: &SourcePath) -> Result<u64, RowSourceError> {
        let mut file = Self::open_file(path).await?;
        let mut buf = vec![0u8; COUNT_BUFFER_SIZE];
        let mut lines: u64 = 0;
        let mut last_byte: Option<u8> = None;

        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            lines += buf[..read].iter().filter(|&&b| b == b'\n').count() as u64;
            last_byte = Some(buf[read - 1]);
        }

        if matches!(last_byte, Some(b) if b != b'\n') {
            lines += 1;
        }
        Ok(lines.saturating_sub(1))
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn open(&self, path: &SourcePath) -> Result<RowStream, RowSourceError> {
        let file = Self::open_file(path).await?;
        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .delimiter(self.delimiter)
            .create_reader(file);

        let headers: Vec<String> = reader
            .headers()
            .await
            .map_err(classify)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let headers = Arc::new(headers);
        tracing::debug!(columns = headers.len(), "CSV header read");

        let stream = reader.into_records().map(move |record| {
            let record = record.map_err(classify)?;
            let fields = record.iter().map(str::to_string).collect();
            Ok(Row::new(Arc::clone(&headers), fields))
        });

        Ok(stream.boxed())
    }
}
