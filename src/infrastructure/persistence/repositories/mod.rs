mod in_memory_repository;
mod pg_job_repository;
mod pg_row_error_repository;

pub use in_memory_repository::{InMemoryJobRepository, InMemoryRowErrorRepository};
pub use pg_job_repository::PgJobRepository;
pub use pg_row_error_repository::PgRowErrorRepository;

fn to_db_count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
