//! The caller-facing facade.

use crate::connections::ConnectionPool;
use crate::dispatcher::{Dispatcher, TaskInvocation};
use crate::fanout::FanOutExecutor;
use crate::registry::{TaskDescriptor, TaskRegistry};
use crate::tester::ConnectionTester;
use debugkit_core::{
    Connector, ConnectorError, DebugKitError, Result, Settings, TaskResult, UnitSelection,
    Validatable,
};
use debugkit_sources::{
    ConnectorFactory, ConnectorProvider, CredentialStore, SourceCredential, SourceKind,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Summary of what an SDK instance supports and has configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdkInfo {
    /// Library version
    pub version: String,
    /// Every supported source
    pub supported_sources: Vec<String>,
    /// Sources with credentials
    pub configured_sources: Vec<String>,
    /// Registered task count per supported source
    pub tasks_per_source: BTreeMap<String, usize>,
}

/// One configured credential with its secrets redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    /// Credential identity
    pub identity: u32,
    /// Configuration block the credential came from
    pub block: String,
    /// Field values, sensitive ones replaced by a mask
    pub fields: BTreeMap<String, String>,
}

impl From<&SourceCredential> for CredentialSummary {
    fn from(credential: &SourceCredential) -> Self {
        Self {
            identity: credential.identity(),
            block: credential.block_name().to_string(),
            fields: credential.redacted_fields(),
        }
    }
}

/// Entry point: dispatches tasks against configured sources.
///
/// Each instance owns its credentials and the connections built from them.
pub struct DebugKit {
    settings: Settings,
    credentials: Arc<CredentialStore>,
    registry: Arc<TaskRegistry>,
    dispatcher: Arc<Dispatcher>,
    fan_out: FanOutExecutor,
    tester: ConnectionTester,
}

impl DebugKit {
    /// Start building an instance
    #[must_use]
    pub fn builder() -> DebugKitBuilder {
        DebugKitBuilder::default()
    }

    /// Build an instance from settings, loading `settings.credentials_path`
    pub fn from_settings(settings: Settings, factory: ConnectorFactory) -> Result<Self> {
        Self::builder()
            .settings(settings)
            .connector_factory(factory)
            .build()
    }

    /// Settings in effect
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Every supported source, configured or not
    #[must_use]
    pub fn list_supported_sources(&self) -> Vec<String> {
        self.registry.list_sources()
    }

    /// Sources with at least one credential
    #[must_use]
    pub fn list_configured_sources(&self) -> Vec<String> {
        self.credentials
            .configured_sources()
            .iter()
            .map(|source| source.name().to_string())
            .collect()
    }

    /// Task types available for a source
    pub fn list_available_tasks(&self, source_name: &str) -> Result<Vec<String>> {
        self.registry.list_tasks(source_name)
    }

    /// Descriptor of one task, including its parameter schema
    pub fn describe_task(&self, source_name: &str, task_type: &str) -> Result<Arc<TaskDescriptor>> {
        self.registry.lookup(source_name, task_type)
    }

    /// Probe a configured source
    pub async fn test_connection(&self, source_name: &str) -> Result<bool> {
        self.tester.test_connection(source_name).await
    }

    /// Probe every configured source
    pub async fn test_all_connections(&self) -> BTreeMap<String, bool> {
        self.tester.test_all().await
    }

    /// Run one task and return its payload.
    ///
    /// Connector failures are returned as [`DebugKitError::TaskExecution`].
    pub async fn execute(&self, invocation: &TaskInvocation) -> Result<Value> {
        let result = self.dispatcher.dispatch(invocation).await?;
        result.into_result().map_err(DebugKitError::from)
    }

    /// Run one task and return the full result, failed or not
    pub async fn dispatch(&self, invocation: &TaskInvocation) -> Result<TaskResult> {
        self.dispatcher.dispatch(invocation).await
    }

    /// Run a task once per unit
    pub async fn execute_all(
        &self,
        invocation: &TaskInvocation,
        units: UnitSelection,
    ) -> Result<Vec<TaskResult>> {
        self.fan_out.dispatch_many(invocation, units).await
    }

    /// Versions, sources and task counts
    #[must_use]
    pub fn sdk_info(&self) -> SdkInfo {
        SdkInfo {
            version: crate::VERSION.to_string(),
            supported_sources: self.list_supported_sources(),
            configured_sources: self.list_configured_sources(),
            tasks_per_source: SourceKind::ALL
                .iter()
                .map(|source| (source.name().to_string(), self.registry.task_count(*source)))
                .collect(),
        }
    }

    /// Credential fields of a source that are stored as secrets
    pub fn masked_keys(&self, source_name: &str) -> Result<Vec<&'static str>> {
        let source: SourceKind = source_name.parse()?;
        Ok(source.credential_spec().sensitive.to_vec())
    }

    /// Configured credentials of a source with secrets redacted
    pub fn credential_summary(&self, source_name: &str) -> Result<Vec<CredentialSummary>> {
        let source: SourceKind = source_name.parse()?;
        let credentials = self.credentials.credentials(source);
        if credentials.is_empty() {
            return Err(DebugKitError::config(format!(
                "source '{source}' has no configured credentials"
            )));
        }
        Ok(credentials
            .iter()
            .map(|credential| CredentialSummary::from(credential.as_ref()))
            .collect())
    }
}

impl fmt::Debug for DebugKit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugKit")
            .field("configured_sources", &self.list_configured_sources())
            .field("max_concurrency", &self.fan_out.max_concurrency())
            .finish_non_exhaustive()
    }
}

/// Builder for [`DebugKit`]
#[derive(Default)]
pub struct DebugKitBuilder {
    settings: Option<Settings>,
    credentials: Option<CredentialStore>,
    credentials_path: Option<PathBuf>,
    factory: ConnectorFactory,
    registry: Option<Arc<TaskRegistry>>,
}

impl DebugKitBuilder {
    /// Use these settings instead of the defaults
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Use an already loaded credential store
    #[must_use]
    pub fn credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Load credentials from this file instead of `settings.credentials_path`
    #[must_use]
    pub fn credentials_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Register the connector provider of a source
    #[must_use]
    pub fn connector(mut self, source: SourceKind, provider: Arc<dyn ConnectorProvider>) -> Self {
        self.factory.register(source, provider);
        self
    }

    /// Register a closure as the connector provider of a source
    #[must_use]
    pub fn connector_fn<F>(mut self, source: SourceKind, connect: F) -> Self
    where
        F: Fn(&SourceCredential) -> std::result::Result<Arc<dyn Connector>, ConnectorError>
            + Send
            + Sync
            + 'static,
    {
        self.factory = self.factory.with_fn(source, connect);
        self
    }

    /// Replace the connector factory
    #[must_use]
    pub fn connector_factory(mut self, factory: ConnectorFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Use this task registry instead of the process-wide one
    #[must_use]
    pub fn registry(mut self, registry: Arc<TaskRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validate settings, load credentials and assemble the SDK.
    ///
    /// Credential loading is all or nothing: one bad block fails the build.
    pub fn build(self) -> Result<DebugKit> {
        let settings = self.settings.unwrap_or_default();
        settings.validate()?;

        let credentials = match (self.credentials, self.credentials_path) {
            (Some(store), _) => store,
            (None, Some(path)) => CredentialStore::from_path(path)?,
            (None, None) => CredentialStore::from_path(&settings.credentials_path)?,
        };
        let credentials = Arc::new(credentials);
        let registry = self.registry.unwrap_or_else(TaskRegistry::global);

        let connections = Arc::new(ConnectionPool::new(Arc::clone(&credentials), self.factory));
        let dispatcher = Arc::new(Dispatcher::from_settings(
            Arc::clone(&registry),
            Arc::clone(&connections),
            &settings.dispatch,
        ));
        let fan_out = FanOutExecutor::new(Arc::clone(&dispatcher), settings.dispatch.max_concurrency);
        let tester = ConnectionTester::new(connections, settings.dispatch.connection_timeout());

        info!(
            configured = credentials.configured_sources().len(),
            credentials = credentials.len(),
            "debugkit ready"
        );

        Ok(DebugKit {
            settings,
            credentials,
            registry,
            dispatcher,
            fan_out,
            tester,
        })
    }
}
