//! Logging setup, parameter masking and metrics helpers.

use crate::config::{LogFormat, LoggingSettings};
use serde_json::Value;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Replacement text for masked values
pub const MASK: &str = "***";

const SENSITIVE_MARKERS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "app_key",
    "pem",
    "private_key",
    "credential",
    "kubeconfig",
    "connection_string",
];

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false`
/// when a subscriber was already installed.
pub fn init_tracing(settings: &LoggingSettings) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let installed = match settings.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
    };
    installed.is_ok()
}

/// Whether a parameter or credential key holds a secret
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| key.contains(marker))
}

/// Copy of `value` with every sensitive entry replaced by [`MASK`]
#[must_use]
pub fn mask_sensitive(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let masked = if is_sensitive_key(key) && !value.is_null() {
                        Value::from(MASK)
                    } else {
                        mask_sensitive(value)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask_sensitive).collect()),
        other => other.clone(),
    }
}

/// Record the outcome of one task call
pub fn record_task(source: &str, task_type: &str, success: bool, elapsed: Duration) {
    #[cfg(feature = "observability")]
    {
        let status = if success { "success" } else { "failure" };
        metrics::counter!(
            "debugkit_tasks_total",
            "source" => source.to_string(),
            "task_type" => task_type.to_string(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "debugkit_task_duration_seconds",
            "source" => source.to_string(),
            "task_type" => task_type.to_string()
        )
        .record(elapsed.as_secs_f64());
    }
    #[cfg(not(feature = "observability"))]
    let _ = (source, task_type, success, elapsed);
}

/// Record the outcome of one liveness probe
pub fn record_connection_test(source: &str, reachable: bool) {
    #[cfg(feature = "observability")]
    {
        let reachable = if reachable { "true" } else { "false" };
        metrics::counter!(
            "debugkit_connection_tests_total",
            "source" => source.to_string(),
            "reachable" => reachable
        )
        .increment(1);
    }
    #[cfg(not(feature = "observability"))]
    let _ = (source, reachable);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_sensitive_keys() {
        assert!(is_sensitive_key("grafana_api_key"));
        assert!(is_sensitive_key("remote_PASSWORD"));
        assert!(is_sensitive_key("remote_pem"));
        assert!(!is_sensitive_key("grafana_host"));
        assert!(!is_sensitive_key("query_expression"));
    }

    #[test]
    fn test_mask_nested_values() {
        let masked = mask_sensitive(&json!({
            "query": "up",
            "auth": {"api_token": "abc", "user": "ops"},
            "targets": [{"password": "hunter2"}],
            "secret": null
        }));
        assert_eq!(
            masked,
            json!({
                "query": "up",
                "auth": {"api_token": "***", "user": "ops"},
                "targets": [{"password": "***"}],
                "secret": null
            })
        );
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        let settings = LoggingSettings::default();
        let _ = init_tracing(&settings);
        assert!(!init_tracing(&settings));
    }

    #[test]
    fn test_record_without_recorder() {
        record_task("grafana", "fetch_folders", true, Duration::from_millis(5));
        record_connection_test("grafana", false);
    }
}
