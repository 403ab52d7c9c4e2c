//! Single task dispatch.
//!
//! A dispatch runs in two phases. The preflight resolves the task
//! descriptor, the cached source connection and the time range; any error
//! there concerns the whole call. The call phase substitutes variables,
//! checks the parameter schema and invokes the handler under a timeout.
//! Connector failures and timeouts come back as a failed [`TaskResult`],
//! never as an `Err`.

use crate::connections::ConnectionPool;
use crate::registry::{TaskDescriptor, TaskRegistry};
use crate::variables::{VariableBinding, VariableResolver};
use chrono::{DateTime, Utc};
use debugkit_core::observability::{mask_sensitive, record_task};
use debugkit_core::{
    DispatchSettings, Params, Result, TaskExecutionError, TaskRequest, TaskResult, TimeRange,
    TimeWindow, ValidationError,
};
use debugkit_sources::{SourceConnection, SourceKind};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything a caller supplies for one task call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskInvocation {
    /// Source name, e.g. `grafana`
    pub source_name: String,
    /// Task type, e.g. `datasource_query_execution`
    pub task_type: String,
    /// Raw parameters, possibly holding placeholders
    pub params: Params,
    /// Requested time window
    pub window: TimeWindow,
    /// Template variable values
    pub variables: VariableBinding,
}

impl TaskInvocation {
    /// A call with no parameters, the default window and no variables
    pub fn new<S: Into<String>, T: Into<String>>(source_name: S, task_type: T) -> Self {
        Self {
            source_name: source_name.into(),
            task_type: task_type.into(),
            ..Self::default()
        }
    }

    /// Replace all parameters
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Set one parameter
    #[must_use]
    pub fn with_param<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set the time window
    #[must_use]
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    /// Use the last `minutes` minutes
    #[must_use]
    pub fn last_minutes(self, minutes: u32) -> Self {
        self.with_window(TimeWindow::last_minutes(minutes))
    }

    /// Use an explicit range
    #[must_use]
    pub fn between(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.with_window(TimeWindow::between(start, end))
    }

    /// Replace all variables
    #[must_use]
    pub fn with_variables(mut self, variables: VariableBinding) -> Self {
        self.variables = variables;
        self
    }

    /// Bind one variable
    #[must_use]
    pub fn with_variable<K: Into<String>, V: Into<Value>>(mut self, name: K, value: V) -> Self {
        self.variables.insert(name, value);
        self
    }
}

/// Call-wide state resolved before any parameter is touched.
#[derive(Debug, Clone)]
pub(crate) struct Preflight {
    pub(crate) descriptor: Arc<TaskDescriptor>,
    pub(crate) connection: Arc<SourceConnection>,
    pub(crate) time_range: TimeRange,
}

impl Preflight {
    fn source(&self) -> SourceKind {
        self.descriptor.source()
    }

    fn task_type(&self) -> &str {
        self.descriptor.task_type()
    }
}

/// Resolves and runs single task calls.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<TaskRegistry>,
    connections: Arc<ConnectionPool>,
    resolver: VariableResolver,
    task_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(
        registry: Arc<TaskRegistry>,
        connections: Arc<ConnectionPool>,
        resolver: VariableResolver,
        task_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            connections,
            resolver,
            task_timeout,
        }
    }

    /// Create a dispatcher tuned by `settings`
    #[must_use]
    pub fn from_settings(
        registry: Arc<TaskRegistry>,
        connections: Arc<ConnectionPool>,
        settings: &DispatchSettings,
    ) -> Self {
        Self::new(
            registry,
            connections,
            VariableResolver::new(settings.default_duration_minutes),
            settings.task_timeout(),
        )
    }

    /// Task registry in use
    #[must_use]
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Connection pool in use
    #[must_use]
    pub fn connections(&self) -> &Arc<ConnectionPool> {
        &self.connections
    }

    /// Timeout applied to each task call
    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// Dispatch one task.
    ///
    /// Unknown sources or tasks, missing credentials, connection failures and
    /// invalid parameters are returned as `Err` before the connector is
    /// called. Anything the connector reports is a failed [`TaskResult`].
    pub async fn dispatch(&self, invocation: &TaskInvocation) -> Result<TaskResult> {
        let call_id = Uuid::new_v4();
        let span = info_span!(
            "dispatch",
            %call_id,
            source = %invocation.source_name,
            task_type = %invocation.task_type
        );
        self.dispatch_in_span(call_id, invocation).instrument(span).await
    }

    async fn dispatch_in_span(
        &self,
        call_id: Uuid,
        invocation: &TaskInvocation,
    ) -> Result<TaskResult> {
        let preflight = self.preflight(
            &invocation.source_name,
            &invocation.task_type,
            &invocation.window,
        )?;
        let params = self.resolve_params(&preflight, &invocation.params, &invocation.variables)?;
        Ok(self.run(call_id, &preflight, params, None).await)
    }

    pub(crate) fn preflight(
        &self,
        source_name: &str,
        task_type: &str,
        window: &TimeWindow,
    ) -> Result<Preflight> {
        let descriptor = self.registry.lookup(source_name, task_type)?;
        let connection = self.connections.get(descriptor.source())?;
        let time_range = self.resolver.resolve_time_range(window)?;
        Ok(Preflight {
            descriptor,
            connection,
            time_range,
        })
    }

    fn resolve_params(
        &self,
        preflight: &Preflight,
        params: &Params,
        variables: &VariableBinding,
    ) -> std::result::Result<Params, ValidationError> {
        let schema = preflight.descriptor.schema();
        let substituted = self.resolver.substitute(schema, params, variables)?;
        schema.apply(substituted)
    }

    /// Run one fan-out unit. Invalid unit parameters become a failed result.
    pub(crate) async fn dispatch_unit(
        &self,
        preflight: &Preflight,
        params: &Params,
        variables: &VariableBinding,
        identifier: String,
    ) -> TaskResult {
        let call_id = Uuid::new_v4();
        let span = info_span!(
            "dispatch",
            %call_id,
            source = %preflight.source(),
            task_type = %preflight.task_type(),
            unit = %identifier
        );

        async move {
            match self.resolve_params(preflight, params, variables) {
                Ok(params) => self.run(call_id, preflight, params, Some(identifier)).await,
                Err(error) => {
                    warn!(%error, "unit parameters are invalid");
                    record_task(preflight.source().name(), preflight.task_type(), false, Duration::ZERO);
                    TaskResult::failure(
                        preflight.source().name(),
                        preflight.task_type(),
                        Some(identifier),
                        error.into(),
                    )
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        call_id: Uuid,
        preflight: &Preflight,
        params: Params,
        identifier: Option<String>,
    ) -> TaskResult {
        let source_name = preflight.source().name();
        let task_type = preflight.task_type();
        let masked = mask_sensitive(&Value::Object(params.clone()));
        debug!(params = %masked, "resolved parameters");

        let request = TaskRequest {
            call_id,
            source_name: source_name.to_string(),
            task_type: task_type.to_string(),
            identifier: identifier.clone(),
            params,
            time_range: preflight.time_range,
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.task_timeout,
            preflight.descriptor.handler().handle(&preflight.connection, &request),
        )
        .await;
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(Ok(payload)) => {
                info!(?elapsed, "task succeeded");
                TaskResult::success(source_name, task_type, identifier, payload)
            }
            Ok(Err(err)) => {
                error!(error = %err, ?elapsed, "task failed");
                TaskResult::failure(
                    source_name,
                    task_type,
                    identifier,
                    TaskExecutionError::failed(source_name, task_type, err),
                )
            }
            Err(_) => {
                warn!(timeout = ?self.task_timeout, "task timed out");
                TaskResult::failure(
                    source_name,
                    task_type,
                    identifier,
                    TaskExecutionError::TimedOut {
                        source_name: source_name.to_string(),
                        task_type: task_type.to_string(),
                        timeout_ms: u64::try_from(self.task_timeout.as_millis()).unwrap_or(u64::MAX),
                    },
                )
            }
        };

        record_task(source_name, task_type, result.is_success(), elapsed);
        result.with_duration(elapsed)
    }
}
