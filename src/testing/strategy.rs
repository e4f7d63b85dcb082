use super::lock;
use crate::dispatch::{DispatchError, DispatchReport, DispatchRequest, DispatchStrategy, StrategyTag};
use crate::model::{Row, VariableScope};
use crate::runtime::RuntimeError;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// Snapshot of one dispatch as the strategy received it
#[derive(Debug, Clone, PartialEq)]
pub struct SeenDispatch {
    pub target: StrategyTag,
    pub pipeline: String,
    /// Effective parameter values of the activated definition
    pub parameters: BTreeMap<String, String>,
    pub variables: VariableScope,
    pub arguments: Vec<String>,
    pub prior_rows: Vec<Row>,
    pub prior_files: Vec<String>,
    pub suppress_rows: bool,
    pub log_file: Option<String>,
}

enum Scripted {
    Report(DispatchReport),
    Fail(String),
}

/// Strategy that records every dispatch and replays scripted reports.
///
/// Once the script runs out every further dispatch returns an empty,
/// successful report.
#[derive(Default)]
pub struct CountingStrategy {
    script: Mutex<VecDeque<Scripted>>,
    seen: Mutex<Vec<SeenDispatch>>,
}

impl CountingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_report(self, report: DispatchReport) -> Self {
        lock(&self.script).push_back(Scripted::Report(report));
        self
    }

    /// Next dispatch fails before producing any outcome
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        lock(&self.script).push_back(Scripted::Fail(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        lock(&self.seen).len()
    }

    pub fn seen(&self) -> Vec<SeenDispatch> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl DispatchStrategy for CountingStrategy {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn dispatch(&self, request: DispatchRequest<'_>) -> Result<DispatchReport, DispatchError> {
        lock(&self.seen).push(SeenDispatch {
            target: request.target.clone(),
            pipeline: request.definition.name.clone(),
            parameters: request.definition.effective_parameters(),
            variables: request.definition.variables.clone(),
            arguments: request.arguments.to_vec(),
            prior_rows: request.prior.rows.clone(),
            prior_files: request.prior.files.keys().cloned().collect(),
            suppress_rows: request.suppress_rows,
            log_file: request.log.map(|log| log.file.clone()),
        });

        match lock(&self.script).pop_front() {
            Some(Scripted::Report(report)) => Ok(report),
            Some(Scripted::Fail(message)) => Err(DispatchError::Runtime(RuntimeError::Failed(message))),
            None => Ok(DispatchReport::default()),
        }
    }
}
