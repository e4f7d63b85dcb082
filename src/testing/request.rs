use crate::config::OrchestratorConfig;
use crate::dispatch::{CancelSignal, DispatchRequest, LogForwarding, StrategyTag};
use crate::model::{PipelineDefinition, PipelineReference, RunOutcome, VariableScope, WorkerRegistry};

/// Owns everything a [`DispatchRequest`] borrows, for driving one strategy
/// directly. Fields are public so tests can adjust them before
/// [`RequestFixture::request`].
pub struct RequestFixture {
    pub target: StrategyTag,
    pub config: OrchestratorConfig,
    pub definition: PipelineDefinition,
    pub arguments: Vec<String>,
    pub prior: RunOutcome,
    pub scope: VariableScope,
    pub workers: WorkerRegistry,
    pub suppress_rows: bool,
    pub log: Option<LogForwarding>,
}

impl RequestFixture {
    /// Entry `entry` running pipeline `child` with empty scope and input
    pub fn new(target: StrategyTag) -> Self {
        Self {
            target,
            config: OrchestratorConfig::new("entry", PipelineReference::by_path("child.yml")),
            definition: PipelineDefinition::new("child"),
            arguments: Vec::new(),
            prior: RunOutcome::new(),
            scope: VariableScope::new(),
            workers: WorkerRegistry::new(),
            suppress_rows: false,
            log: None,
        }
    }

    pub fn request<'a>(&'a self, cancel: &'a dyn CancelSignal) -> DispatchRequest<'a> {
        DispatchRequest {
            entry: &self.config.name,
            target: &self.target,
            definition: &self.definition,
            arguments: &self.arguments,
            prior: &self.prior,
            config: &self.config,
            parent_scope: &self.scope,
            workers: &self.workers,
            suppress_rows: self.suppress_rows,
            log: self.log.as_ref(),
            cancel,
        }
    }
}
