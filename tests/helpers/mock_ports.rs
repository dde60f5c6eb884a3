use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use rowstream::application::ports::{
    JobRepository, RepositoryError, RowHook, RowHookError, RowSource, RowSourceError, RowStream,
};
use rowstream::application::services::ProgressReporter;
use rowstream::application::services::ProgressSnapshot;
use rowstream::domain::{Job, JobCompletion, JobId, JobStatus, Row, SourcePath};
use rowstream::infrastructure::persistence::InMemoryJobRepository;

#[derive(Debug, Clone)]
pub enum ScriptedItem {
    Row(Row),
    Malformed(String),
    Fault(String),
}

pub fn row_with_id(id: u64) -> Row {
    let headers = Arc::new(vec!["id".to_string(), "name".to_string()]);
    Row::new(headers, vec![id.to_string(), format!("item-{id}")])
}

/// Row source fed from a fixed script. Counts how many items were pulled.
pub struct ScriptedRowSource {
    items: Vec<ScriptedItem>,
    exists: bool,
    count: Option<u64>,
    pulled: Arc<AtomicUsize>,
}

impl ScriptedRowSource {
    pub fn new(items: Vec<ScriptedItem>) -> Self {
        let count = items.len() as u64;
        Self {
            items,
            exists: true,
            count: Some(count),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn numbered(rows: u64) -> Self {
        Self::new((1..=rows).map(|id| ScriptedItem::Row(row_with_id(id))).collect())
    }

    pub fn missing() -> Self {
        let mut source = Self::new(vec![]);
        source.exists = false;
        source
    }

    pub fn with_count(mut self, count: Option<u64>) -> Self {
        self.count = count;
        self
    }

    pub fn pulled(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.pulled)
    }
}

#[async_trait::async_trait]
impl RowSource for ScriptedRowSource {
    async fn exists(&self, _path: &SourcePath) -> Result<bool, RowSourceError> {
        Ok(self.exists)
    }

    async fn count_rows(&self, path: &SourcePath) -> Result<u64, RowSourceError> {
        self.count
            .ok_or_else(|| RowSourceError::NotFound(path.to_string()))
    }

    async fn open(&self, path: &SourcePath) -> Result<RowStream, RowSourceError> {
        if !self.exists {
            return Err(RowSourceError::NotFound(path.to_string()));
        }
        let pulled = Arc::clone(&self.pulled);
        let stream = futures::stream::iter(self.items.clone()).map(move |item| {
            pulled.fetch_add(1, Ordering::SeqCst);
            match item {
                ScriptedItem::Row(row) => Ok(row),
                ScriptedItem::Malformed(message) => Err(RowSourceError::Malformed(message)),
                ScriptedItem::Fault(message) => Err(RowSourceError::Io(std::io::Error::other(
                    message,
                ))),
            }
        });
        Ok(stream.boxed())
    }
}

/// Rejects rows whose `id` column is in the set. Optionally records how many
/// items the source had handed out when each row reached the hook.
pub struct RejectIdsHook {
    ids: HashSet<String>,
    pulled: Option<Arc<AtomicUsize>>,
    calls: AtomicUsize,
    read_ahead_seen: AtomicBool,
}

impl RejectIdsHook {
    pub fn new(ids: &[u64]) -> Self {
        Self {
            ids: ids.iter().map(u64::to_string).collect(),
            pulled: None,
            calls: AtomicUsize::new(0),
            read_ahead_seen: AtomicBool::new(false),
        }
    }

    pub fn watching(mut self, pulled: Arc<AtomicUsize>) -> Self {
        self.pulled = Some(pulled);
        self
    }

    pub fn read_ahead_seen(&self) -> bool {
        self.read_ahead_seen.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RowHook for RejectIdsHook {
    async fn process(&self, row: &Row) -> Result<(), RowHookError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(pulled) = &self.pulled {
            if pulled.load(Ordering::SeqCst) != call {
                self.read_ahead_seen.store(true, Ordering::SeqCst);
            }
        }
        tokio::task::yield_now().await;

        match row.get("id") {
            Some(id) if self.ids.contains(id) => {
                Err(RowHookError::Rejected(format!("id {id} rejected")))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl RecordingReporter {
    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, _job_id: JobId, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

/// In-memory repository whose individual operations can be made to fail.
#[derive(Default)]
pub struct FlakyJobRepository {
    pub inner: InMemoryJobRepository,
    pub fail_get: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_finalize: AtomicBool,
}

impl FlakyJobRepository {
    fn check(flag: &AtomicBool) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            Err(RepositoryError::ConnectionFailed("store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl JobRepository for FlakyJobRepository {
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        Self::check(&self.fail_create)?;
        self.inner.create(job).await
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Self::check(&self.fail_get)?;
        self.inner.get_by_id(id).await
    }

    async fn update_status(&self, id: JobId, status: JobStatus) -> Result<(), RepositoryError> {
        self.inner.update_status(id, status).await
    }

    async fn set_total_rows(&self, id: JobId, total_rows: u64) -> Result<(), RepositoryError> {
        self.inner.set_total_rows(id, total_rows).await
    }

    async fn update_progress(
        &self,
        id: JobId,
        processed_rows: u64,
        error_rows: u64,
    ) -> Result<(), RepositoryError> {
        self.inner
            .update_progress(id, processed_rows, error_rows)
            .await
    }

    async fn finalize(
        &self,
        id: JobId,
        completion: &JobCompletion,
    ) -> Result<bool, RepositoryError> {
        Self::check(&self.fail_finalize)?;
        self.inner.finalize(id, completion).await
    }

    async fn delete(&self, id: JobId) -> Result<(), RepositoryError> {
        self.inner.delete(id).await
    }
}
