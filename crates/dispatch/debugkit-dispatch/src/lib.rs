//! # debugkit dispatch
//!
//! Runs named tasks against configured monitoring sources without the
//! caller knowing any source's wire protocol.
//!
//! ## Features
//!
//! - **Task Registry**: write-once table of tasks and parameter schemas per source
//! - **Variable Resolution**: time windows and `$var` / `${var:format}` placeholders
//! - **Dispatch**: validation before any network call, per-call timeouts and spans
//! - **Fan-Out**: bounded concurrency with results in unit order and per-unit failures
//! - **Connection Testing**: liveness probes that tell "unreachable" from "not configured"
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use debugkit_dispatch::prelude::*;
//!
//! # async fn run(kit: DebugKit) -> Result<()> {
//! let invocation = TaskInvocation::new("grafana", "query_prometheus")
//!     .with_param("datasource_uid", "prom")
//!     .with_param("query", "sum(rate(http_requests_total{cluster=\"$cluster\"}[5m]))")
//!     .with_variable("cluster", "prod-eu")
//!     .last_minutes(30);
//!
//! let payload = kit.execute(&invocation).await?;
//! println!("{payload}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod connections;
pub mod dispatcher;
pub mod fanout;
pub mod registry;
pub mod sdk;
pub mod tester;
pub mod variables;

// Re-export commonly used items
pub use connections::ConnectionPool;
pub use dispatcher::{Dispatcher, TaskInvocation};
pub use fanout::FanOutExecutor;
pub use registry::{ForwardToConnector, TaskDescriptor, TaskHandler, TaskRegistry, TaskRegistryBuilder};
pub use sdk::{CredentialSummary, DebugKit, DebugKitBuilder, SdkInfo};
pub use tester::ConnectionTester;
pub use variables::{VariableBinding, VariableResolver};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DebugKit, DebugKitBuilder, FanOutExecutor, TaskInvocation, TaskRegistry, VariableBinding,
    };
    pub use debugkit_core::{
        DebugKitError, FanOutUnit, Result, Settings, TaskResult, TimeWindow, UnitSelection,
    };
    pub use debugkit_sources::{ConnectorFactory, CredentialStore, SourceKind};
}

/// Version information for the debugkit dispatch library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
