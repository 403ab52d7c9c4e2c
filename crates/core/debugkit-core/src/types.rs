//! Task schemas, requests and results.

use crate::error::{TaskExecutionError, ValidationError};
use crate::time::TimeRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Task parameters keyed by name
pub type Params = serde_json::Map<String, Value>;

/// Declared type of a task parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Text
    String,
    /// Whole number
    Integer,
    /// true / false
    Boolean,
    /// List of strings
    StringList,
    /// Mapping of named values
    Object,
    /// List of mappings, e.g. a set of sub-queries
    ObjectList,
    /// Anything JSON can express
    Any,
}

impl ParamType {
    /// Check whether a value has this type
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::Object => value.is_object(),
            Self::ObjectList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object)),
            Self::Any => true,
        }
    }

    /// Human readable description used in validation errors
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Boolean => "a boolean",
            Self::StringList => "a list of strings",
            Self::Object => "an object",
            Self::ObjectList => "a list of objects",
            Self::Any => "any value",
        }
    }
}

/// One declared parameter of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Whether the parameter must be present after substitution
    pub required: bool,
    /// Declared type
    #[serde(rename = "type")]
    pub kind: ParamType,
    /// Value used when an optional parameter is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Free text such as a shell command: only bound placeholders are
    /// replaced and any other `$` text is kept as written
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub verbatim: bool,
}

impl ParamSpec {
    /// A required parameter
    pub fn required<S: Into<String>>(name: S, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            required: true,
            kind,
            default: None,
            verbatim: false,
        }
    }

    /// An optional parameter without a default
    pub fn optional<S: Into<String>>(name: S, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            required: false,
            kind,
            default: None,
            verbatim: false,
        }
    }

    /// Set the default value
    #[must_use]
    pub fn with_default<V: Into<Value>>(mut self, value: V) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark the parameter as verbatim text
    #[must_use]
    pub fn verbatim(mut self) -> Self {
        self.verbatim = true;
        self
    }
}

/// The parameter schema of one task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSchema {
    /// Task type name
    pub task_type: String,
    /// Declared parameters, in declaration order
    pub params: Vec<ParamSpec>,
}

impl TaskSchema {
    /// Create a schema
    pub fn new<S: Into<String>>(task_type: S, params: Vec<ParamSpec>) -> Self {
        Self {
            task_type: task_type.into(),
            params,
        }
    }

    /// Look up a declared parameter
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }

    /// Whether a parameter is declared verbatim
    #[must_use]
    pub fn is_verbatim(&self, name: &str) -> bool {
        self.param(name).is_some_and(|spec| spec.verbatim)
    }

    /// Names of the required parameters
    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name.as_str())
    }

    /// Check required parameters and declared types, then fill defaults.
    ///
    /// Null values count as absent. Parameters the schema does not declare
    /// are passed through untouched.
    pub fn apply(&self, mut params: Params) -> Result<Params, ValidationError> {
        params.retain(|_, value| !value.is_null());

        for spec in &self.params {
            match params.get(&spec.name) {
                Some(value) if !spec.kind.accepts(value) => {
                    return Err(ValidationError::InvalidParameterType {
                        task_type: self.task_type.clone(),
                        name: spec.name.clone(),
                        expected: spec.kind.describe().to_string(),
                    });
                }
                Some(_) => {}
                None if spec.required => {
                    return Err(ValidationError::MissingParameter {
                        task_type: self.task_type.clone(),
                        name: spec.name.clone(),
                    });
                }
                None => {
                    if let Some(default) = &spec.default {
                        params.insert(spec.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(params)
    }
}

/// A fully resolved call handed to a connector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRequest {
    /// Correlates log lines of one dispatch
    pub call_id: Uuid,
    /// Source name
    pub source_name: String,
    /// Task type
    pub task_type: String,
    /// Fan-out unit identifier, if this call is one unit of a batch
    pub identifier: Option<String>,
    /// Parameters after substitution and defaults
    pub params: Params,
    /// Resolved time range
    pub time_range: TimeRange,
}

/// One sub-item of a fan-out batch, e.g. a dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOutUnit {
    /// Identifier reported back in the unit's result
    pub identifier: String,
    /// Parameters that override the shared parameters for this unit
    #[serde(default)]
    pub overrides: Params,
}

impl FanOutUnit {
    /// A unit with no overrides
    pub fn new<S: Into<String>>(identifier: S) -> Self {
        Self {
            identifier: identifier.into(),
            overrides: Params::new(),
        }
    }

    /// Add a parameter override
    #[must_use]
    pub fn with_override<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }
}

/// How the units of a fan-out call are chosen.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UnitSelection {
    /// Ask the connector for every unit of the task, in discovery order
    #[default]
    Discover,
    /// Discover, then keep only these identifiers, in this order
    Only(Vec<String>),
    /// Use these units as given
    Explicit(Vec<FanOutUnit>),
}

/// Success or failure of one task call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The connector returned a payload
    Success,
    /// The call failed
    Failure,
}

/// Payload or error of one task call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The connector returned a payload
    Success {
        /// Connector response
        payload: Value,
    },
    /// The call failed
    Failure {
        /// What went wrong
        error: TaskExecutionError,
    },
}

/// The normalized result of one task call or one fan-out unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskResult {
    /// Source name
    pub source_name: String,
    /// Task type
    pub task_type: String,
    /// Fan-out unit identifier
    pub identifier: Option<String>,
    /// Payload or error
    #[serde(flatten)]
    pub outcome: TaskOutcome,
    /// Wall time of the call
    pub duration_ms: u64,
    /// When the call finished
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    /// A successful result
    pub fn success<S: Into<String>, T: Into<String>>(
        source_name: S,
        task_type: T,
        identifier: Option<String>,
        payload: Value,
    ) -> Self {
        Self::with_outcome(source_name, task_type, identifier, TaskOutcome::Success { payload })
    }

    /// A failed result
    pub fn failure<S: Into<String>, T: Into<String>>(
        source_name: S,
        task_type: T,
        identifier: Option<String>,
        error: TaskExecutionError,
    ) -> Self {
        Self::with_outcome(source_name, task_type, identifier, TaskOutcome::Failure { error })
    }

    fn with_outcome<S: Into<String>, T: Into<String>>(
        source_name: S,
        task_type: T,
        identifier: Option<String>,
        outcome: TaskOutcome,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            task_type: task_type.into(),
            identifier,
            outcome,
            duration_ms: 0,
            completed_at: Utc::now(),
        }
    }

    /// Record the call duration
    #[must_use]
    pub fn with_duration(mut self, elapsed: std::time::Duration) -> Self {
        self.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Success or failure
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        match self.outcome {
            TaskOutcome::Success { .. } => TaskStatus::Success,
            TaskOutcome::Failure { .. } => TaskStatus::Failure,
        }
    }

    /// Check for success
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status() == TaskStatus::Success
    }

    /// The payload of a successful call
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            TaskOutcome::Success { payload } => Some(payload),
            TaskOutcome::Failure { .. } => None,
        }
    }

    /// The error of a failed call
    #[must_use]
    pub fn error(&self) -> Option<&TaskExecutionError> {
        match &self.outcome {
            TaskOutcome::Failure { error } => Some(error),
            TaskOutcome::Success { .. } => None,
        }
    }

    /// Turn the outcome into a `Result`
    pub fn into_result(self) -> Result<Value, TaskExecutionError> {
        match self.outcome {
            TaskOutcome::Success { payload } => Ok(payload),
            TaskOutcome::Failure { error } => Err(error),
        }
    }
}
