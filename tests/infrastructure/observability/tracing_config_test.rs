use rowstream::infrastructure::observability::{DEFAULT_FILTER, TracingConfig};

#[test]
fn given_blank_filter_when_configuring_then_default_filter_applies() {
    let config = TracingConfig::new("test", false).with_filter(Some("   ".to_string()));

    assert_eq!(config.filter, None);
}

#[test]
fn given_explicit_filter_when_configuring_then_it_is_kept() {
    let config = TracingConfig::new("prod", true).with_filter(Some("warn".to_string()));

    assert_eq!(config.filter.as_deref(), Some("warn"));
    assert!(config.json_format);
    assert_eq!(config.environment, "prod");
}

#[test]
fn given_default_filter_then_crate_and_http_layers_log_at_debug() {
    assert!(DEFAULT_FILTER.contains("rowstream=debug"));
    assert!(DEFAULT_FILTER.contains("tower_http=debug"));
}
