//! Task registry
//!
//! Maps `(source, task_type)` to a [`TaskDescriptor`]: the declared parameter
//! schema plus the handler that runs the task. Registries are assembled with
//! [`TaskRegistryBuilder`] and are immutable once built. The process-wide
//! table is installed at most once; every later read is lock free.

use async_trait::async_trait;
use debugkit_core::{
    ConnectorError, DebugKitError, Result, TaskExecutionError, TaskRequest, TaskSchema,
    ValidationError,
};
use debugkit_sources::{builtin_tasks, SourceConnection, SourceKind};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

static GLOBAL_REGISTRY: OnceCell<Arc<TaskRegistry>> = OnceCell::new();

/// Runs one resolved task against a connection.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Execute `request` using `connection`
    async fn handle(
        &self,
        connection: &SourceConnection,
        request: &TaskRequest,
    ) -> std::result::Result<Value, ConnectorError>;
}

/// Sends the request unchanged to the source's connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardToConnector;

#[async_trait]
impl TaskHandler for ForwardToConnector {
    async fn handle(
        &self,
        connection: &SourceConnection,
        request: &TaskRequest,
    ) -> std::result::Result<Value, ConnectorError> {
        connection.execute_task(request).await
    }
}

/// A registered task: its source, parameter schema and handler.
#[derive(Clone)]
pub struct TaskDescriptor {
    source: SourceKind,
    schema: TaskSchema,
    handler: Arc<dyn TaskHandler>,
}

impl TaskDescriptor {
    /// Source the task belongs to
    #[must_use]
    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Task type name
    #[must_use]
    pub fn task_type(&self) -> &str {
        &self.schema.task_type
    }

    /// Declared parameters
    #[must_use]
    pub fn schema(&self) -> &TaskSchema {
        &self.schema
    }

    /// Handler invoked for the task
    #[must_use]
    pub fn handler(&self) -> &dyn TaskHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("source", &self.source)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Immutable table of tasks per source.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<SourceKind, BTreeMap<String, Arc<TaskDescriptor>>>,
}

impl TaskRegistry {
    /// Start an empty registry
    #[must_use]
    pub fn builder() -> TaskRegistryBuilder {
        TaskRegistryBuilder::default()
    }

    /// Registry with the built-in catalogue of every supported source
    #[must_use]
    pub fn builtin() -> Self {
        Self::builder().with_builtin_tasks().build()
    }

    /// Install the process-wide registry.
    ///
    /// Fails once a registry is installed, including the built-in one that
    /// [`TaskRegistry::global`] installs on first use.
    pub fn install(registry: TaskRegistry) -> Result<Arc<TaskRegistry>> {
        let registry = Arc::new(registry);
        GLOBAL_REGISTRY
            .set(Arc::clone(&registry))
            .map_err(|_| DebugKitError::config("task registry is already installed"))?;
        Ok(registry)
    }

    /// The process-wide registry, installing the built-in one if none is set
    pub fn global() -> Arc<TaskRegistry> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(Self::builtin())))
    }

    /// Resolve a task.
    ///
    /// An unknown source is a [`ValidationError`]; a known source without
    /// the task is [`TaskExecutionError::UnknownTask`].
    pub fn lookup(&self, source_name: &str, task_type: &str) -> Result<Arc<TaskDescriptor>> {
        let source: SourceKind = source_name.parse()?;
        self.tasks
            .get(&source)
            .and_then(|tasks| tasks.get(task_type))
            .cloned()
            .ok_or_else(|| {
                TaskExecutionError::UnknownTask {
                    source_name: source_name.to_string(),
                    task_type: task_type.to_string(),
                }
                .into()
            })
    }

    /// Task types of a source, sorted
    pub fn list_tasks(&self, source_name: &str) -> Result<Vec<String>> {
        let source: SourceKind = source_name.parse()?;
        Ok(self
            .tasks
            .get(&source)
            .map(|tasks| tasks.keys().cloned().collect())
            .unwrap_or_default())
    }

    /// Every supported source name, configured or not
    #[must_use]
    pub fn list_sources(&self) -> Vec<String> {
        SourceKind::ALL.iter().map(|kind| kind.name().to_string()).collect()
    }

    /// Number of tasks registered for a source
    #[must_use]
    pub fn task_count(&self, source: SourceKind) -> usize {
        self.tasks.get(&source).map_or(0, BTreeMap::len)
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self
            .tasks
            .iter()
            .map(|(source, tasks)| (source.name(), tasks.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("TaskRegistry").field("tasks", &counts).finish()
    }
}

/// Builder for [`TaskRegistry`]
#[derive(Default)]
pub struct TaskRegistryBuilder {
    tasks: HashMap<SourceKind, BTreeMap<String, Arc<TaskDescriptor>>>,
}

impl TaskRegistryBuilder {
    /// Add the built-in catalogue of every supported source
    #[must_use]
    pub fn with_builtin_tasks(mut self) -> Self {
        let handler: Arc<dyn TaskHandler> = Arc::new(ForwardToConnector);
        for source in SourceKind::ALL {
            for schema in builtin_tasks(source) {
                self.insert(source, schema, Arc::clone(&handler));
            }
        }
        self
    }

    /// Register one task.
    ///
    /// Registering a task type twice for the same source is a configuration
    /// error; tasks are never silently replaced.
    pub fn register(
        mut self,
        source_name: &str,
        schema: TaskSchema,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<Self> {
        let source: SourceKind = source_name
            .parse()
            .map_err(|e: ValidationError| DebugKitError::config(e))?;
        let exists = self
            .tasks
            .get(&source)
            .is_some_and(|tasks| tasks.contains_key(&schema.task_type));
        if exists {
            return Err(DebugKitError::config(format!(
                "task '{}' is already registered for source '{source}'",
                schema.task_type
            )));
        }
        self.insert(source, schema, handler);
        Ok(self)
    }

    fn insert(&mut self, source: SourceKind, schema: TaskSchema, handler: Arc<dyn TaskHandler>) {
        debug!(%source, task_type = %schema.task_type, "registering task");
        let task_type = schema.task_type.clone();
        let descriptor = TaskDescriptor {
            source,
            schema,
            handler,
        };
        self.tasks
            .entry(source)
            .or_default()
            .insert(task_type, Arc::new(descriptor));
    }

    /// Freeze the registry
    #[must_use]
    pub fn build(self) -> TaskRegistry {
        TaskRegistry { tasks: self.tasks }
    }
}
