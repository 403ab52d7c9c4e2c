//! Fan-out execution
//!
//! Runs one task once per unit (a dashboard panel, a named builder query)
//! with at most `max_concurrency` units in flight. Results come back in unit
//! order whatever the completion order. A unit that fails, times out or has
//! invalid parameters yields a failed [`TaskResult`] and never stops the
//! other units.
//!
//! Every unit is spawned onto the runtime before results are collected.
//! Dropping the returned future leaves spawned units running until they
//! finish or time out; their results are discarded.

use crate::dispatcher::{Dispatcher, Preflight, TaskInvocation};
use debugkit_core::{
    DebugKitError, FanOutUnit, Result, TaskExecutionError, TaskResult, UnitSelection,
};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Dispatches a task over many units with bounded concurrency.
#[derive(Debug, Clone)]
pub struct FanOutExecutor {
    dispatcher: Arc<Dispatcher>,
    max_concurrency: usize,
}

impl FanOutExecutor {
    /// Create an executor; a concurrency of zero is treated as one
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, max_concurrency: usize) -> Self {
        Self {
            dispatcher,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Upper bound on units in flight
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Dispatch `invocation` once per selected unit.
    ///
    /// Unit overrides win over the shared parameters. Errors that concern
    /// the whole batch (unknown source or task, missing credentials,
    /// connection failures, an invalid time window, failed discovery) are
    /// returned as `Err`; everything else is reported per unit.
    pub async fn dispatch_many(
        &self,
        invocation: &TaskInvocation,
        selection: UnitSelection,
    ) -> Result<Vec<TaskResult>> {
        let batch_id = Uuid::new_v4();
        let span = info_span!(
            "fan_out",
            %batch_id,
            source = %invocation.source_name,
            task_type = %invocation.task_type
        );
        self.dispatch_many_in_span(invocation, selection)
            .instrument(span)
            .await
    }

    async fn dispatch_many_in_span(
        &self,
        invocation: &TaskInvocation,
        selection: UnitSelection,
    ) -> Result<Vec<TaskResult>> {
        let preflight = Arc::new(self.dispatcher.preflight(
            &invocation.source_name,
            &invocation.task_type,
            &invocation.window,
        )?);
        let units = self.select_units(&preflight, invocation, selection).await?;
        if units.is_empty() {
            info!("no units selected");
            return Ok(Vec::new());
        }

        info!(units = units.len(), max_concurrency = self.max_concurrency, "dispatching units");
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let variables = Arc::new(invocation.variables.clone());
        let mut identifiers = Vec::with_capacity(units.len());
        let mut handles = Vec::with_capacity(units.len());

        for unit in units {
            let mut params = invocation.params.clone();
            params.extend(unit.overrides);
            identifiers.push(unit.identifier.clone());

            let dispatcher = Arc::clone(&self.dispatcher);
            let preflight = Arc::clone(&preflight);
            let variables = Arc::clone(&variables);
            let semaphore = Arc::clone(&semaphore);
            let identifier = unit.identifier;
            handles.push(tokio::spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    Some(
                        dispatcher
                            .dispatch_unit(&preflight, &params, &variables, identifier)
                            .await,
                    )
                }
                .in_current_span(),
            ));
        }

        let results: Vec<TaskResult> = join_all(handles)
            .await
            .into_iter()
            .zip(identifiers)
            .map(|(joined, identifier)| match joined {
                Ok(Some(result)) => result,
                Ok(None) => aborted(&preflight, identifier, "unit was cancelled before it ran"),
                Err(err) => aborted(&preflight, identifier, &format!("unit aborted: {err}")),
            })
            .collect();

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(units = results.len(), failed, "fan-out finished");
        Ok(results)
    }

    async fn select_units(
        &self,
        preflight: &Preflight,
        invocation: &TaskInvocation,
        selection: UnitSelection,
    ) -> Result<Vec<FanOutUnit>> {
        let wanted = match selection {
            UnitSelection::Explicit(units) => return Ok(units),
            UnitSelection::Discover => None,
            UnitSelection::Only(ids) => Some(ids),
        };

        let task_type = preflight.descriptor.task_type();
        let discovered = preflight
            .connection
            .client()
            .discover_units(task_type, &invocation.params)
            .await
            .map_err(|err| {
                DebugKitError::from(TaskExecutionError::failed(
                    preflight.descriptor.source().name(),
                    task_type,
                    format!("unit discovery failed: {err}"),
                ))
            })?;

        let Some(ids) = wanted else {
            return Ok(discovered);
        };
        let mut selected = Vec::with_capacity(ids.len());
        for id in ids {
            match discovered.iter().find(|unit| unit.identifier == id) {
                Some(unit) => selected.push(unit.clone()),
                None => warn!(identifier = %id, "requested unit was not discovered, skipping"),
            }
        }
        Ok(selected)
    }
}

fn aborted(preflight: &Preflight, identifier: String, reason: &str) -> TaskResult {
    let source_name = preflight.descriptor.source().name();
    let task_type = preflight.descriptor.task_type();
    warn!(identifier = %identifier, reason, "unit produced no result");
    TaskResult::failure(
        source_name,
        task_type,
        Some(identifier),
        TaskExecutionError::failed(source_name, task_type, reason),
    )
}
