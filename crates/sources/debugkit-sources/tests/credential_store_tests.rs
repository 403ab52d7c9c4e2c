//! Credential store and connector factory behaviour over real files

mod common;

use async_trait::async_trait;
use common::{CredentialsFixture, MIXED_CREDENTIALS};
use debugkit_core::{Connector, ConnectorError, DebugKitError, TaskRequest};
use debugkit_sources::{ConnectorFactory, CredentialStore, SourceCredential, SourceKind};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;

struct AlwaysUp;

#[async_trait]
impl Connector for AlwaysUp {
    async fn test_connection(&self) -> Result<bool, ConnectorError> {
        Ok(true)
    }

    async fn execute_task(&self, _request: &TaskRequest) -> Result<Value, ConnectorError> {
        Ok(Value::Null)
    }
}

fn always_up(_: &SourceCredential) -> Result<Arc<dyn Connector>, ConnectorError> {
    Ok(Arc::new(AlwaysUp))
}

#[test]
fn test_load_mixed_file() {
    let fixture = CredentialsFixture::new(MIXED_CREDENTIALS);
    let store = CredentialStore::from_path(&fixture.path).expect("credentials should load");

    assert_eq!(
        store.configured_sources(),
        vec![SourceKind::Grafana, SourceKind::Bash, SourceKind::Kubernetes]
    );
    assert_eq!(store.len(), 4);

    let identities: Vec<u32> = store
        .credentials(SourceKind::Bash)
        .iter()
        .map(|c| c.identity())
        .collect();
    assert_eq!(identities, vec![1, 2]);
    assert_eq!(store.default_credential(SourceKind::Bash).unwrap().identity(), 1);

    let cluster = store.get(SourceKind::Kubernetes, 3).expect("cluster credential");
    assert_eq!(cluster.block_name(), "prod_cluster");
    assert!(cluster.fields().any(|(name, value)| name == "kubeconfig" && value.is_secret()));
}

#[test]
fn test_missing_file_is_configuration_error() {
    let err = CredentialStore::from_path("/definitely/not/here.yaml").unwrap_err();
    assert!(matches!(err, DebugKitError::Configuration(ref msg) if msg.contains("not/here.yaml")));
}

#[test]
fn test_one_bad_block_fails_whole_file() {
    let content = format!("{MIXED_CREDENTIALS}\nsentry:\n  sentry_api_url: https://sentry.io\n");
    let fixture = CredentialsFixture::new(&content);
    let err = CredentialStore::from_path(&fixture.path).unwrap_err();
    assert!(matches!(err, DebugKitError::Configuration(ref msg) if msg.contains("sentry_api_token")));
}

#[tokio::test]
async fn test_factory_connects_every_loaded_credential() {
    let fixture = CredentialsFixture::new(MIXED_CREDENTIALS);
    let store = CredentialStore::from_path(&fixture.path).expect("credentials should load");

    let factory = ConnectorFactory::new()
        .with_fn(SourceKind::Grafana, always_up)
        .with_fn(SourceKind::Bash, always_up)
        .with_fn(SourceKind::Kubernetes, always_up);

    for source in store.configured_sources() {
        for credential in store.credentials(source) {
            let connection = factory
                .connect(credential.clone())
                .expect("connection should be created");
            assert_eq!(connection.source(), source);
            assert!(connection.test_connection().await.expect("probe should succeed"));
        }
    }
}
