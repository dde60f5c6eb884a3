/// Configuration for tracing initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
    pub with_source_location: bool,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

impl TracingConfig {
    pub fn new(environment: impl Into<String>, json_format: bool) -> Self {
        Self {
            environment: environment.into(),
            json_format,
            with_source_location: true,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    /// `LOG_FORMAT=json` forces JSON output regardless of settings.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.json_format = format.eq_ignore_ascii_case("json");
        }
        self
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new("local", false).apply_env_overrides()
    }
}
