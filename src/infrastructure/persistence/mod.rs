mod pg_pool;
mod repositories;

pub use repositories::{
    InMemoryJobRepository, InMemoryRowErrorRepository, PgJobRepository, PgRowErrorRepository,
};

pub use pg_pool::{create_pool, run_migrations};
