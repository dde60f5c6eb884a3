mod job;
mod job_id;
mod job_row_error;
mod job_status;
mod queue_message;
mod row;
mod source_path;

pub use job::{Job, JobCompletion, JobCounters};
pub use job_id::JobId;
pub use job_row_error::JobRowError;
pub use job_status::{JobStatus, StatusVocabulary};
pub use queue_message::{MessageError, QueueMessage};
pub use row::Row;
pub use source_path::SourcePath;
