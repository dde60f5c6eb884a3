mod job_queue;
mod job_repository;
mod repository_error;
mod row_error_repository;
mod row_hook;
mod row_source;
mod upload_store;

pub use job_queue::{Acknowledger, Delivery, JobQueue, QueueError, Settlement};
pub use job_repository::JobRepository;
pub use repository_error::RepositoryError;
pub use row_error_repository::RowErrorRepository;
pub use row_hook::{RowHook, RowHookError};
pub use row_source::{RowSource, RowSourceError, RowStream};
pub use upload_store::{UploadStore, UploadStoreError};
