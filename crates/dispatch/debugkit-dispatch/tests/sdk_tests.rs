//! SDK construction and discovery operations

mod common;

use common::{credentials, kit, ScriptedConnector, CREDENTIALS};
use debugkit_core::{DebugKitError, Settings, ValidationError};
use debugkit_dispatch::{DebugKit, TaskRegistry};
use debugkit_sources::{ConnectorFactory, SourceKind};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_configured_sources_are_supported() {
    let connector = ScriptedConnector::new().into_arc();
    let kit = kit(&connector);

    let supported = kit.list_supported_sources();
    let configured = kit.list_configured_sources();
    assert_eq!(supported.len(), SourceKind::ALL.len());
    assert_eq!(configured, vec!["grafana", "bash"]);
    assert!(configured.iter().all(|source| supported.contains(source)));
}

#[test]
fn test_sdk_info() {
    let connector = ScriptedConnector::new().into_arc();
    let info = kit(&connector).sdk_info();

    assert!(!info.version.is_empty());
    assert_eq!(info.configured_sources, vec!["grafana", "bash"]);
    assert_eq!(info.tasks_per_source["grafana"], 9);
    assert_eq!(info.tasks_per_source["kubernetes"], 2);
    assert_eq!(info.tasks_per_source.len(), SourceKind::ALL.len());
}

#[test]
fn test_task_discovery() {
    let connector = ScriptedConnector::new().into_arc();
    let kit = kit(&connector);

    let tasks = kit.list_available_tasks("bash").unwrap();
    assert_eq!(tasks, vec!["command"]);

    let descriptor = kit.describe_task("sentry", "fetch_event_info_by_id").unwrap();
    let required: Vec<_> = descriptor.schema().required_params().collect();
    assert_eq!(required, vec!["event_id", "project_slug"]);

    let err = kit.list_available_tasks("nagios").unwrap_err();
    assert_eq!(err, DebugKitError::from(ValidationError::unknown_source("nagios")));
}

#[test]
fn test_secrets_are_masked() {
    let connector = ScriptedConnector::new().into_arc();
    let kit = kit(&connector);

    assert_eq!(kit.masked_keys("bash").unwrap(), vec!["remote_password", "remote_pem"]);

    let summary = kit.credential_summary("grafana").unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].identity, 1);
    assert_eq!(summary[0].fields["grafana_host"], "https://grafana.example.com");
    assert_eq!(summary[0].fields["grafana_api_key"], "***");

    assert!(matches!(
        kit.credential_summary("posthog"),
        Err(DebugKitError::Configuration(_))
    ));
}

#[test]
fn test_build_from_settings_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials.yaml");
    std::fs::write(&path, CREDENTIALS).unwrap();

    let settings = Settings {
        credentials_path: path,
        ..Settings::default()
    };
    let kit = DebugKit::from_settings(settings, ConnectorFactory::new()).unwrap();
    assert_eq!(kit.list_configured_sources(), vec!["grafana", "bash"]);
    assert_eq!(kit.settings().dispatch.max_concurrency, 8);
}

#[test]
fn test_missing_credentials_file_fails_build() {
    let err = DebugKit::builder()
        .credentials_path("/nonexistent/credentials.yaml")
        .registry(Arc::new(TaskRegistry::builtin()))
        .build()
        .unwrap_err();
    assert!(matches!(err, DebugKitError::Configuration(_)));
}

#[test]
fn test_invalid_settings_fail_build() {
    let mut settings = Settings::default();
    settings.dispatch.max_concurrency = 0;

    let err = DebugKit::builder()
        .settings(settings)
        .credentials(credentials())
        .build()
        .unwrap_err();
    assert!(matches!(err, DebugKitError::Configuration(ref msg) if msg.contains("max_concurrency")));
}
