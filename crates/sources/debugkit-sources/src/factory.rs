//! Factory for creating source connections
//!
//! Every source kind gets a structural credential check here; the concrete
//! client comes from a [`ConnectorProvider`] registered for that kind.
//! Building a connection never touches the network. Reachability is only
//! known after a liveness probe or the first real task call.

use crate::credentials::SourceCredential;
use crate::source::SourceKind;
use debugkit_core::{Connector, ConnectorError, DebugKitError, Result, TaskRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Builds connectors for one source kind.
pub trait ConnectorProvider: Send + Sync {
    /// Create a client bound to `credential`
    fn connect(
        &self,
        credential: &SourceCredential,
    ) -> std::result::Result<Arc<dyn Connector>, ConnectorError>;
}

/// Provider backed by a closure
pub struct FnProvider<F>(F);

impl<F> ConnectorProvider for FnProvider<F>
where
    F: Fn(&SourceCredential) -> std::result::Result<Arc<dyn Connector>, ConnectorError>
        + Send
        + Sync,
{
    fn connect(
        &self,
        credential: &SourceCredential,
    ) -> std::result::Result<Arc<dyn Connector>, ConnectorError> {
        (self.0)(credential)
    }
}

/// A connected client bound to exactly one credential.
#[derive(Clone)]
pub struct SourceConnection {
    credential: Arc<SourceCredential>,
    client: Arc<dyn Connector>,
}

impl SourceConnection {
    /// Source kind
    #[must_use]
    pub fn source(&self) -> SourceKind {
        self.credential.source()
    }

    /// Identity of the bound credential
    #[must_use]
    pub fn identity(&self) -> u32 {
        self.credential.identity()
    }

    /// The bound credential
    #[must_use]
    pub fn credential(&self) -> &Arc<SourceCredential> {
        &self.credential
    }

    /// The underlying client
    #[must_use]
    pub fn client(&self) -> &dyn Connector {
        self.client.as_ref()
    }

    /// Liveness probe
    pub async fn test_connection(&self) -> std::result::Result<bool, ConnectorError> {
        self.client.test_connection().await
    }

    /// Execute one resolved task
    pub async fn execute_task(
        &self,
        request: &TaskRequest,
    ) -> std::result::Result<Value, ConnectorError> {
        self.client.execute_task(request).await
    }
}

impl fmt::Debug for SourceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConnection")
            .field("source", &self.source())
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}

/// Factory for creating source connections
#[derive(Clone, Default)]
pub struct ConnectorFactory {
    providers: HashMap<SourceKind, Arc<dyn ConnectorProvider>>,
}

impl ConnectorFactory {
    /// Create a factory with no providers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider
    #[must_use]
    pub fn with_provider(mut self, source: SourceKind, provider: Arc<dyn ConnectorProvider>) -> Self {
        self.register(source, provider);
        self
    }

    /// Register a closure as provider
    #[must_use]
    pub fn with_fn<F>(self, source: SourceKind, connect: F) -> Self
    where
        F: Fn(&SourceCredential) -> std::result::Result<Arc<dyn Connector>, ConnectorError>
            + Send
            + Sync
            + 'static,
    {
        self.with_provider(source, Arc::new(FnProvider(connect)))
    }

    /// Register a provider, replacing any previous one for the same source
    pub fn register(&mut self, source: SourceKind, provider: Arc<dyn ConnectorProvider>) {
        self.providers.insert(source, provider);
    }

    /// Whether a provider is registered for a source
    #[must_use]
    pub fn has_provider(&self, source: SourceKind) -> bool {
        self.providers.contains_key(&source)
    }

    /// Validate the credential's shape and build a connection
    pub fn connect(&self, credential: Arc<SourceCredential>) -> Result<SourceConnection> {
        let source = credential.source();
        check_credential_shape(&credential).map_err(|reason| {
            DebugKitError::connection(format!(
                "{source} credential '{}' (id {}) is unusable: {reason}",
                credential.block_name(),
                credential.identity()
            ))
        })?;

        let provider = self.providers.get(&source).ok_or_else(|| {
            DebugKitError::connection(format!("no connector registered for source '{source}'"))
        })?;
        let client = provider.connect(&credential).map_err(|e| {
            DebugKitError::connection(format!("failed to create {source} connector: {e}"))
        })?;

        debug!(%source, identity = credential.identity(), "created source connection");
        Ok(SourceConnection { credential, client })
    }
}

impl fmt::Debug for ConnectorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<_> = self.providers.keys().collect();
        sources.sort();
        f.debug_struct("ConnectorFactory")
            .field("sources", &sources)
            .finish()
    }
}

/// Structural checks that need no network access.
pub fn check_credential_shape(credential: &SourceCredential) -> std::result::Result<(), String> {
    match credential.source() {
        SourceKind::Grafana => {
            require_url(credential, "grafana_host")?;
            optional_bool(credential, "ssl_verify")
        }
        SourceKind::Signoz => require_url(credential, "signoz_api_url"),
        SourceKind::Bash => {
            if !credential.has("remote_password") && !credential.has("remote_pem") {
                return Err("neither remote_password nor remote_pem is set".to_string());
            }
            optional_port(credential, "port")
        }
        SourceKind::Kubernetes => check_kubeconfig(credential),
        SourceKind::Cloudwatch => Ok(()),
        SourceKind::Sentry => require_url(credential, "sentry_api_url"),
        SourceKind::Datadog => {
            if credential.has("datadog_host") {
                require_url(credential, "datadog_host")
            } else {
                Ok(())
            }
        }
        SourceKind::Newrelic => match credential.get("newrelic_region") {
            None => Ok(()),
            Some(region) if ["us", "eu"].contains(&region.to_ascii_lowercase().as_str()) => Ok(()),
            Some(region) => Err(format!("newrelic_region '{region}' must be 'us' or 'eu'")),
        },
        SourceKind::Postgres => optional_port(credential, "port"),
        SourceKind::Posthog => require_url(credential, "posthog_host"),
        SourceKind::SqlDatabaseConnection => match credential.get("connection_string") {
            Some(dsn) if dsn.contains("://") => Ok(()),
            _ => Err("connection_string must look like scheme://...".to_string()),
        },
        SourceKind::Clickhouse => optional_port(credential, "clickhouse_port"),
    }
}

fn require_url(credential: &SourceCredential, field: &str) -> std::result::Result<(), String> {
    match credential.get(field) {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
        Some(url) => Err(format!("{field} '{url}' must start with http:// or https://")),
        None => Err(format!("{field} is not set")),
    }
}

fn optional_port(credential: &SourceCredential, field: &str) -> std::result::Result<(), String> {
    match credential.get(field) {
        Some(port) if port.parse::<u16>().is_err() => {
            Err(format!("{field} '{port}' is not a valid port"))
        }
        _ => Ok(()),
    }
}

fn optional_bool(credential: &SourceCredential, field: &str) -> std::result::Result<(), String> {
    match credential.get(field) {
        Some(flag) if flag.parse::<bool>().is_err() => {
            Err(format!("{field} '{flag}' must be true or false"))
        }
        _ => Ok(()),
    }
}

fn check_kubeconfig(credential: &SourceCredential) -> std::result::Result<(), String> {
    let raw = credential
        .get("kubeconfig")
        .ok_or_else(|| "kubeconfig is not set".to_string())?;

    // A single line is a path, anything longer is the document itself
    let document = if raw.contains('\n') {
        raw.to_string()
    } else {
        std::fs::read_to_string(Path::new(raw.trim()))
            .map_err(|e| format!("cannot read kubeconfig {raw}: {e}"))?
    };

    let parsed: serde_yaml::Value =
        serde_yaml::from_str(&document).map_err(|e| format!("kubeconfig is not valid YAML: {e}"))?;
    if !parsed.get("clusters").is_some_and(serde_yaml::Value::is_sequence) {
        return Err("kubeconfig has no clusters list".to_string());
    }

    if let Some(context) = credential.get("context").filter(|c| !c.trim().is_empty()) {
        let known = parsed
            .get("contexts")
            .and_then(serde_yaml::Value::as_sequence)
            .is_some_and(|contexts| {
                contexts.iter().any(|entry| {
                    entry.get("name").and_then(serde_yaml::Value::as_str) == Some(context)
                })
            });
        if !known {
            return Err(format!("context '{context}' is not defined in the kubeconfig"));
        }
    }
    Ok(())
}
