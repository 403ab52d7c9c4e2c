//! # debugkit core
//!
//! Shared building blocks of the debugkit crates: the error taxonomy,
//! runtime settings, time ranges, task schemas and results, and the
//! [`Connector`] trait every source integration implements.
//!
//! ## Features
//!
//! - **Error Handling**: configuration, connection, validation and task execution errors
//! - **Configuration**: layered settings via the `config` crate
//! - **Time Ranges**: explicit or duration-based windows with one derivation per call
//! - **Observability**: `tracing` setup, secret masking and `metrics` counters
//!
//! ## Quick Start
//!
//! ```rust
//! use debugkit_core::{Result, TimeWindow};
//!
//! fn last_quarter_hour() -> Result<i64> {
//!     let range = TimeWindow::last_minutes(15).resolve(60)?;
//!     Ok(range.time_lt() - range.time_geq())
//! }
//!
//! assert_eq!(last_quarter_hour().unwrap(), 900);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod observability;
pub mod time;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use config::{DispatchSettings, LogFormat, LoggingSettings, Settings};
pub use error::{ConnectorError, DebugKitError, Result, TaskExecutionError, ValidationError};
pub use time::{TimeRange, TimeWindow};
pub use traits::{Connector, Validatable};
pub use types::{
    FanOutUnit, ParamSpec, ParamType, Params, TaskOutcome, TaskRequest, TaskResult, TaskSchema,
    TaskStatus, UnitSelection,
};

/// Version information for the debugkit core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
