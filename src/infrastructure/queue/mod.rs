mod in_memory_queue;
mod pg_job_queue;

pub use in_memory_queue::{InMemoryJobQueue, SettledMessage};
pub use pg_job_queue::PgJobQueue;
