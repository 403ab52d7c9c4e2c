//! Core traits used across the debugkit crates.

use crate::error::{ConnectorError, Result};
use crate::types::{FanOutUnit, Params, TaskRequest};
use async_trait::async_trait;
use serde_json::Value;

/// A connected client for one source.
///
/// Implementations own the wire protocol of their source. The dispatcher
/// shares one connector between concurrent fan-out units, so implementations
/// must be safe for concurrent calls.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Liveness probe. `Ok(false)` means reachable but unhealthy.
    async fn test_connection(&self) -> std::result::Result<bool, ConnectorError>;

    /// Execute one fully resolved task
    async fn execute_task(&self, request: &TaskRequest)
        -> std::result::Result<Value, ConnectorError>;

    /// Enumerate the units of a fan-out task, e.g. the panels of a dashboard
    async fn discover_units(
        &self,
        task_type: &str,
        _params: &Params,
    ) -> std::result::Result<Vec<FanOutUnit>, ConnectorError> {
        Err(ConnectorError::Unsupported(format!(
            "unit discovery for task '{task_type}'"
        )))
    }
}

/// Trait for validatable objects
pub trait Validatable {
    /// Validate this object
    fn validate(&self) -> Result<()>;

    /// Check if this object is valid
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
