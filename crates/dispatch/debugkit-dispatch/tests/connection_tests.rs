//! Connection testing: unconfigured, unreachable and healthy sources

mod common;

use common::{credentials, factory, kit, ScriptedConnector};
use debugkit_core::{Connector, ConnectorError, DebugKitError, ValidationError};
use debugkit_dispatch::{ConnectionPool, ConnectionTester, DebugKit, TaskRegistry};
use debugkit_sources::{ConnectorFactory, SourceKind};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_configured_and_reachable() {
    let connector = ScriptedConnector::new().into_arc();
    assert!(kit(&connector).test_connection("grafana").await.unwrap());
}

#[tokio::test]
async fn test_unconfigured_source_raises_configuration_error() {
    let connector = ScriptedConnector::new().into_arc();
    let err = kit(&connector).test_connection("signoz").await.unwrap_err();
    assert!(matches!(err, DebugKitError::Configuration(_)));
}

#[tokio::test]
async fn test_unknown_source_raises_validation_error() {
    let connector = ScriptedConnector::new().into_arc();
    let err = kit(&connector).test_connection("zabbix").await.unwrap_err();
    assert_eq!(err, DebugKitError::from(ValidationError::unknown_source("zabbix")));
}

#[tokio::test]
async fn test_unreachable_source_returns_false() {
    let connector = ScriptedConnector::new().unreachable().into_arc();
    assert!(!kit(&connector).test_connection("bash").await.unwrap());
}

#[tokio::test]
async fn test_hanging_probe_returns_false_within_timeout() {
    let connector = ScriptedConnector::new()
        .probe_delay(Duration::from_secs(30))
        .into_arc();
    let pool = ConnectionPool::new(Arc::new(credentials()), factory(&connector));
    let tester = ConnectionTester::new(Arc::new(pool), Duration::from_millis(100));

    let started = Instant::now();
    let reachable = tester.test_connection("grafana").await.unwrap();
    assert!(!reachable);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_connector_construction_failure_is_connection_error() {
    let kit = DebugKit::builder()
        .credentials(credentials())
        .connector_fn(SourceKind::Grafana, |_| {
            Err(ConnectorError::Authentication("api key revoked".to_string()))
        })
        .registry(Arc::new(TaskRegistry::builtin()))
        .build()
        .unwrap();

    let err = kit.test_connection("grafana").await.unwrap_err();
    assert!(matches!(err, DebugKitError::Connection(ref msg) if msg.contains("api key revoked")));
}

#[tokio::test]
async fn test_all_connections_reports_every_configured_source() {
    let reachable = ScriptedConnector::new().into_arc();
    let grafana = Arc::clone(&reachable);
    // bash has no provider, so it cannot even be built
    let factory = ConnectorFactory::new()
        .with_fn(SourceKind::Grafana, move |_| Ok(Arc::clone(&grafana) as Arc<dyn Connector>));

    let kit = DebugKit::builder()
        .credentials(credentials())
        .connector_factory(factory)
        .registry(Arc::new(TaskRegistry::builtin()))
        .build()
        .unwrap();

    let expected: BTreeMap<String, bool> =
        [("bash".to_string(), false), ("grafana".to_string(), true)].into_iter().collect();
    assert_eq!(kit.test_all_connections().await, expected);
}
