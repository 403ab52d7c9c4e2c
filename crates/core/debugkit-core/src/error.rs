//! Error types shared by every debugkit crate.
//!
//! Callers see four kinds of failure: configuration, connection, validation
//! and task execution. Connectors report their own [`ConnectorError`], which
//! the dispatcher folds into [`TaskExecutionError`] before it reaches a caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for debugkit operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebugKitError {
    /// Bad or missing credential fields, unknown source types, unreadable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A connector could not be built for a configured credential
    #[error("Connection error: {0}")]
    Connection(String),

    /// Bad task parameters, unresolved variables or a malformed time range
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The downstream source rejected or failed the request
    #[error("Task execution error: {0}")]
    TaskExecution(#[from] TaskExecutionError),
}

impl DebugKitError {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Create a new connection error
    pub fn connection<T: fmt::Display>(msg: T) -> Self {
        Self::Connection(msg.to_string())
    }

    /// Check if the caller can fix this error by changing the request
    #[must_use]
    pub fn is_caller_correctable(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::TaskExecution(err) => matches!(
                err,
                TaskExecutionError::UnknownTask { .. } | TaskExecutionError::InvalidUnit { .. }
            ),
            _ => false,
        }
    }

    /// Check if this error applies to a whole fan-out batch rather than one unit
    #[must_use]
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Connection(_))
    }
}

/// Problems with a request that are detected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// The source name is not one of the supported sources
    #[error("unknown source '{name}'")]
    UnknownSource {
        /// Name as supplied by the caller
        name: String,
    },

    /// A declared required parameter is absent after substitution
    #[error("task '{task_type}' is missing required parameter '{name}'")]
    MissingParameter {
        /// Task being dispatched
        task_type: String,
        /// Parameter name
        name: String,
    },

    /// A parameter value does not have the declared type
    #[error("parameter '{name}' of task '{task_type}' must be {expected}")]
    InvalidParameterType {
        /// Task being dispatched
        task_type: String,
        /// Parameter name
        name: String,
        /// Human readable type description
        expected: String,
    },

    /// A placeholder references a variable with no binding
    #[error("template variable '{name}' has no binding")]
    UnboundVariable {
        /// Variable name as written in the placeholder
        name: String,
    },

    /// A placeholder asks for a format the resolver does not know
    #[error("template variable '{name}' uses unsupported format '{format}'")]
    UnsupportedVariableFormat {
        /// Variable name
        name: String,
        /// Requested format
        format: String,
    },

    /// Only one end of an explicit range was supplied
    #[error("time range needs both start_time and end_time, only {given} was given")]
    PartialTimeRange {
        /// Which bound was present
        given: String,
    },

    /// The range does not satisfy `start < end`
    #[error("time range start {start} must be before end {end}")]
    InvalidTimeRange {
        /// Range start
        start: DateTime<Utc>,
        /// Range end
        end: DateTime<Utc>,
    },
}

impl ValidationError {
    /// Create an unknown source error
    pub fn unknown_source<T: fmt::Display>(name: T) -> Self {
        Self::UnknownSource {
            name: name.to_string(),
        }
    }

    /// Create an unbound variable error
    pub fn unbound_variable<T: fmt::Display>(name: T) -> Self {
        Self::UnboundVariable {
            name: name.to_string(),
        }
    }
}

/// Failures reported for a dispatched task.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskExecutionError {
    /// The source is known but has no task with this name
    #[error("source '{source_name}' has no task '{task_type}'")]
    UnknownTask {
        /// Source name
        source_name: String,
        /// Requested task type
        task_type: String,
    },

    /// The connector rejected or failed the call
    #[error("{source_name}.{task_type} failed: {message}")]
    Failed {
        /// Source name
        source_name: String,
        /// Task type
        task_type: String,
        /// Connector error message
        message: String,
    },

    /// The call did not finish within the per-call timeout
    #[error("{source_name}.{task_type} timed out after {timeout_ms}ms")]
    TimedOut {
        /// Source name
        source_name: String,
        /// Task type
        task_type: String,
        /// Timeout that elapsed, in milliseconds
        timeout_ms: u64,
    },

    /// A fan-out unit failed validation; the batch continued without it
    #[error("invalid unit parameters: {error}")]
    InvalidUnit {
        /// The validation failure of this unit
        error: ValidationError,
    },
}

impl TaskExecutionError {
    /// Create a failure from a connector-level error
    pub fn failed<S: Into<String>, T: Into<String>, M: fmt::Display>(
        source_name: S,
        task_type: T,
        message: M,
    ) -> Self {
        Self::Failed {
            source_name: source_name.into(),
            task_type: task_type.into(),
            message: message.to_string(),
        }
    }

    /// Check if this failure came from parameter validation
    #[must_use]
    pub fn is_validation_derived(&self) -> bool {
        matches!(self, Self::InvalidUnit { .. })
    }

    /// The validation error behind an [`TaskExecutionError::InvalidUnit`] failure
    #[must_use]
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            Self::InvalidUnit { error } => Some(error),
            _ => None,
        }
    }
}

impl From<ValidationError> for TaskExecutionError {
    fn from(error: ValidationError) -> Self {
        Self::InvalidUnit { error }
    }
}

/// Errors raised by connectors, the external clients of each source.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// The source could not be reached
    #[error("source unreachable: {0}")]
    Unreachable(String),

    /// The source refused the credentials
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The source rejected the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The connector does not implement the operation
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// Any other connector failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConnectorError {
    /// Create a rejected request error
    pub fn rejected<T: fmt::Display>(msg: T) -> Self {
        Self::Rejected(msg.to_string())
    }

    /// Create an unreachable source error
    pub fn unreachable<T: fmt::Display>(msg: T) -> Self {
        Self::Unreachable(msg.to_string())
    }
}

/// Result type alias for debugkit operations
pub type Result<T> = std::result::Result<T, DebugKitError>;

impl From<std::io::Error> for DebugKitError {
    fn from(err: std::io::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<serde_yaml::Error> for DebugKitError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration(format!("invalid YAML: {err}"))
    }
}

impl From<config::ConfigError> for DebugKitError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
