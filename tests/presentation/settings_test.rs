use std::time::Duration;

use rowstream::application::services::{DispatchCompensation, FaultAction, ThrottlePolicy};
use rowstream::domain::StatusVocabulary;
use rowstream::presentation::config::{AppMode, BackendSetting, Environment, Settings};

#[test]
fn given_no_config_files_when_loading_then_defaults_apply() {
    let dir = tempfile::tempdir().unwrap();

    let settings = Settings::load_from(dir.path(), Environment::Local).unwrap();

    assert_eq!(settings.app.mode, AppMode::All);
    assert_eq!(settings.database.backend, BackendSetting::Postgres);
    assert_eq!(settings.queue.name, "csv_jobs");
    assert_eq!(
        settings.processing.throttle_policy(),
        ThrottlePolicy::Interval(Duration::from_secs(1))
    );
    assert_eq!(settings.processing.on_fault, FaultAction::Acknowledge);
    assert_eq!(settings.processing.status_vocabulary, StatusVocabulary::Standard);
    assert_eq!(
        settings.dispatch.dispatcher_config().compensation,
        DispatchCompensation::MarkFailed
    );
    assert!(settings.validation.required_columns.is_empty());
}

#[test]
fn given_environment_overlay_when_loading_then_it_overrides_base() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("base.toml"),
        "[processing]\nprogress_policy = \"rows\"\nprogress_every_rows = 250\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("test.toml"),
        "[processing]\nprogress_every_rows = 50\non_fault = \"requeue\"\nstatus_vocabulary = \"legacy\"\n\n[validation]\nrequired_columns = [\"id\", \"email\"]\n",
    )
    .unwrap();

    let settings = Settings::load_from(dir.path(), Environment::Test).unwrap();

    assert_eq!(
        settings.processing.throttle_policy(),
        ThrottlePolicy::EveryRows(50)
    );
    let config = settings.processing.stream_processor_config();
    assert_eq!(config.redelivery.on_fault, FaultAction::Requeue);
    assert_eq!(config.redelivery.max_deliveries, 3);
    assert_eq!(settings.processing.status_vocabulary, StatusVocabulary::Legacy);
    assert_eq!(settings.validation.required_columns, vec!["id", "email"]);
}

#[test]
fn given_worker_mode_then_http_is_not_served() {
    assert!(AppMode::Worker.runs_workers());
    assert!(!AppMode::Worker.serves_http());
    assert!(AppMode::All.serves_http() && AppMode::All.runs_workers());
}

#[test]
fn given_environment_names_when_parsing_then_case_is_ignored() {
    assert_eq!(
        Environment::try_from("PROD".to_string()),
        Ok(Environment::Prod)
    );
    assert!(Environment::try_from("staging".to_string()).is_err());
}
