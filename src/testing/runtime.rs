use super::lock;
use crate::model::{PipelineDefinition, Row, RunOutcome, VariableScope};
use crate::runtime::{PipelineRuntime, RuntimeError, RuntimeHandle, RuntimeOutcome};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Call counts per runtime operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeCalls {
    pub start: usize,
    pub is_finished: usize,
    pub error_count: usize,
    pub stop_all: usize,
    pub wait_until_finished: usize,
    pub collect_outcome: usize,
}

/// What one `start` call received
#[derive(Debug, Clone, PartialEq)]
pub struct StartedRun {
    pub pipeline: String,
    pub arguments: Vec<String>,
    /// Effective parameter values of the activated definition
    pub parameters: BTreeMap<String, String>,
    pub scope: VariableScope,
    pub prior_rows: Vec<Row>,
}

#[derive(Default)]
struct RuntimeState {
    next_handle: u64,
    calls: RuntimeCalls,
    polls: usize,
    stopped: bool,
    starts: Vec<StartedRun>,
}

/// Runtime whose instances finish after a fixed number of polls
pub struct ScriptedRuntime {
    finish_after: usize,
    rows: Vec<Row>,
    errors: u64,
    fail_start: bool,
    state: Mutex<RuntimeState>,
}

impl Default for ScriptedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self {
            finish_after: 1,
            rows: Vec::new(),
            errors: 0,
            fail_start: false,
            state: Mutex::new(RuntimeState::default()),
        }
    }

    /// `is_finished` turns true on its nth call for an instance
    pub fn finish_after_polls(mut self, polls: usize) -> Self {
        self.finish_after = polls;
        self
    }

    /// Rows every instance produces
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_errors(mut self, errors: u64) -> Self {
        self.errors = errors;
        self
    }

    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn calls(&self) -> RuntimeCalls {
        lock(&self.state).calls
    }

    pub fn starts(&self) -> Vec<StartedRun> {
        lock(&self.state).starts.clone()
    }
}

#[async_trait]
impl PipelineRuntime for ScriptedRuntime {
    async fn start(
        &self,
        definition: &PipelineDefinition,
        arguments: &[String],
        scope: &VariableScope,
        prior: &RunOutcome,
    ) -> Result<RuntimeHandle, RuntimeError> {
        let mut state = lock(&self.state);
        state.calls.start += 1;
        if self.fail_start {
            return Err(RuntimeError::StartFailed {
                pipeline: definition.name.clone(),
                message: "scripted start failure".to_string(),
            });
        }

        state.starts.push(StartedRun {
            pipeline: definition.name.clone(),
            arguments: arguments.to_vec(),
            parameters: definition.effective_parameters(),
            scope: scope.clone(),
            prior_rows: prior.rows.clone(),
        });
        state.polls = 0;
        state.stopped = false;
        state.next_handle += 1;
        Ok(RuntimeHandle(state.next_handle))
    }

    async fn is_finished(&self, _handle: RuntimeHandle) -> bool {
        let mut state = lock(&self.state);
        state.calls.is_finished += 1;
        state.polls += 1;
        state.stopped || state.polls >= self.finish_after
    }

    async fn error_count(&self, _handle: RuntimeHandle) -> u64 {
        lock(&self.state).calls.error_count += 1;
        self.errors
    }

    async fn stop_all(&self, _handle: RuntimeHandle) {
        let mut state = lock(&self.state);
        state.calls.stop_all += 1;
        state.stopped = true;
    }

    async fn wait_until_finished(&self, _handle: RuntimeHandle) -> Result<(), RuntimeError> {
        lock(&self.state).calls.wait_until_finished += 1;
        Ok(())
    }

    async fn collect_outcome(&self, _handle: RuntimeHandle) -> Result<RuntimeOutcome, RuntimeError> {
        let mut state = lock(&self.state);
        state.calls.collect_outcome += 1;

        let mut outcome = RunOutcome::failed(self.errors).with_rows(self.rows.clone());
        outcome.stopped = state.stopped;
        Ok(RuntimeOutcome {
            outcome,
            rows_set: !self.rows.is_empty(),
        })
    }
}
