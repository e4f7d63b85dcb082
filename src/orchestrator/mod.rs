//! Iteration Controller and Outcome Aggregator
//!
//! [`Orchestrator::run`] is the single entry point a parent workflow calls for
//! one configured entry: it resolves the child definition once, binds a scope
//! per iteration, hands each iteration to the selected dispatch strategy and
//! folds the reports into one [`RunOutcome`](crate::model::RunOutcome).

pub mod aggregate;
pub mod builder;
pub mod core;
pub(crate) mod events;
pub mod iteration;
pub mod log_artifact;

pub use builder::OrchestratorBuilder;
pub use self::core::{suppresses_result_rows, Orchestrator, SUPPRESS_RESULT_DATA_PREFIX};
pub use iteration::{plan_iterations, IterationPlan};
pub use log_artifact::{LogArtifact, LogArtifactError};

use crate::dispatch::{CancelSignal, NeverCancelled};
use crate::model::{VariableScope, WorkerRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What the parent workflow shares with one invocation
#[derive(Clone)]
pub struct ParentContext {
    /// Name of the parent workflow
    pub name: String,
    pub scope: VariableScope,
    pub arguments: Vec<String>,
    /// Parameters the parent declares, by name
    pub parameters: BTreeMap<String, String>,
    pub workers: WorkerRegistry,
    pub cancel: Arc<dyn CancelSignal>,
}

impl ParentContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: VariableScope::new(),
            arguments: Vec::new(),
            parameters: BTreeMap::new(),
            workers: WorkerRegistry::new(),
            cancel: Arc::new(NeverCancelled),
        }
    }

    pub fn with_scope(mut self, scope: VariableScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_workers(mut self, workers: WorkerRegistry) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<dyn CancelSignal>) -> Self {
        self.cancel = cancel;
        self
    }
}
