//! Liveness probes for configured sources.

use crate::connections::ConnectionPool;
use debugkit_core::observability::record_connection_test;
use debugkit_core::Result;
use debugkit_sources::SourceKind;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Probes sources through their cached connections.
#[derive(Debug, Clone)]
pub struct ConnectionTester {
    connections: Arc<ConnectionPool>,
    timeout: Duration,
}

impl ConnectionTester {
    /// Create a tester with a per-probe timeout
    #[must_use]
    pub fn new(connections: Arc<ConnectionPool>, timeout: Duration) -> Self {
        Self {
            connections,
            timeout,
        }
    }

    /// Probe the default credential of a source.
    ///
    /// Returns `Ok(false)` when the source is configured but the probe fails
    /// or does not answer within the timeout. An unknown source, a source
    /// without credentials, or a connector that cannot be built is an `Err`.
    pub async fn test_connection(&self, source_name: &str) -> Result<bool> {
        let source: SourceKind = source_name.parse()?;
        let connection = self.connections.get(source)?;

        let reachable = match tokio::time::timeout(self.timeout, connection.test_connection()).await {
            Ok(Ok(true)) => {
                info!(%source, "connection test passed");
                true
            }
            Ok(Ok(false)) => {
                warn!(%source, "source answered but reported itself unhealthy");
                false
            }
            Ok(Err(error)) => {
                warn!(%source, %error, "connection test failed");
                false
            }
            Err(_) => {
                warn!(%source, timeout_secs = self.timeout.as_secs_f64(), "connection test timed out");
                false
            }
        };

        record_connection_test(source.name(), reachable);
        Ok(reachable)
    }

    /// Probe every configured source concurrently.
    ///
    /// Any error, including a connector that cannot be built, is reported
    /// as `false`.
    pub async fn test_all(&self) -> BTreeMap<String, bool> {
        let sources = self.connections.credentials().configured_sources();
        let probes = sources.iter().map(|source| async move {
            let reachable = match self.test_connection(source.name()).await {
                Ok(reachable) => reachable,
                Err(error) => {
                    warn!(%source, %error, "source could not be probed");
                    false
                }
            };
            (source.name().to_string(), reachable)
        });
        join_all(probes).await.into_iter().collect()
    }
}
