mod init_tracing;
mod tracing_config;

pub use init_tracing::{DEFAULT_FILTER, init_tracing};
pub use tracing_config::TracingConfig;
