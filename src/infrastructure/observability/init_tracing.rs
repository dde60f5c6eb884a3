use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use super::TracingConfig;

pub const DEFAULT_FILTER: &str = "info,rowstream=debug,tower_http=debug";

/// Installs the global subscriber. `RUST_LOG` overrides the configured filter.
pub fn init_tracing(config: &TracingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter.as_deref().unwrap_or(DEFAULT_FILTER)));

    let registry = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(config.with_source_location)
        .with_line_number(config.with_source_location);

    if config.json_format {
        registry.with(fmt_layer.json()).init();
    } else {
        registry.with(fmt_layer).init();
    }

    tracing::info!(
        environment = %config.environment,
        json_format = config.json_format,
        "Tracing initialized"
    );
}
