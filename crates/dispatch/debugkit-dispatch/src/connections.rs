//! Lazily created, cached source connections of one SDK instance.

use debugkit_core::{DebugKitError, Result};
use debugkit_sources::{ConnectorFactory, CredentialStore, SourceConnection, SourceKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// One connection per configured source, built on first use.
pub struct ConnectionPool {
    credentials: Arc<CredentialStore>,
    factory: ConnectorFactory,
    connections: RwLock<HashMap<SourceKind, Arc<SourceConnection>>>,
}

impl ConnectionPool {
    /// Create an empty pool
    #[must_use]
    pub fn new(credentials: Arc<CredentialStore>, factory: ConnectorFactory) -> Self {
        Self {
            credentials,
            factory,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// The credentials this pool connects with
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Connection for the default credential of `source`.
    ///
    /// A source without credentials is a configuration error. Building the
    /// connection can fail with a connection error; failures are not cached.
    /// The connection is built without holding the pool lock. When two
    /// callers race, the first connection stored wins.
    pub fn get(&self, source: SourceKind) -> Result<Arc<SourceConnection>> {
        if let Some(connection) = self.connections.read().get(&source) {
            return Ok(Arc::clone(connection));
        }

        let credential = self.credentials.default_credential(source).ok_or_else(|| {
            DebugKitError::config(format!("source '{source}' has no configured credentials"))
        })?;

        let built = Arc::new(self.factory.connect(credential)?);
        let connection = Arc::clone(
            self.connections
                .write()
                .entry(source)
                .or_insert_with(|| Arc::clone(&built)),
        );
        if Arc::ptr_eq(&connection, &built) {
            info!(%source, identity = connection.identity(), "connected source");
        } else {
            debug!(%source, "discarded connection built by a racing caller");
        }
        Ok(connection)
    }

    /// Whether a connection for `source` has been built
    #[must_use]
    pub fn is_connected(&self, source: SourceKind) -> bool {
        self.connections.read().contains_key(&source)
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut connected: Vec<_> = self.connections.read().keys().copied().collect();
        connected.sort();
        f.debug_struct("ConnectionPool")
            .field("configured", &self.credentials.configured_sources())
            .field("connected", &connected)
            .finish_non_exhaustive()
    }
}
