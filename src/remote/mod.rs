//! Worker RPC: submitting pipelines to remote workers and tracking them

pub mod http;
pub mod trust;

pub use http::HttpWorkerClient;
pub use trust::TrustStore;

use crate::error::{ErrorCode, PipeflowError};
use crate::model::{PipelineDefinition, Row, RunOutcome, VariableScope, WorkerDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one submission on one worker; dropped after cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHandle {
    pub id: String,
    pub pipeline: String,
    pub worker: WorkerDescriptor,
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.worker.name)
    }
}

/// Everything a worker needs to run one pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub pipeline: PipelineDefinition,
    #[serde(default)]
    pub arguments: Vec<String>,
    /// Effective value of every declared parameter
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub variables: VariableScope,
    /// Input rows handed to the pipeline
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    #[serde(default)]
    pub append_log: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Abort the parent's remote work when this pipeline is aborted
    #[serde(default)]
    pub follow_remote_abort: bool,
}

impl SubmitRequest {
    /// Build a request from an activated definition
    pub fn for_definition(definition: &PipelineDefinition, arguments: &[String]) -> Self {
        Self {
            pipeline: definition.clone(),
            arguments: arguments.to_vec(),
            parameters: definition.effective_parameters(),
            variables: definition.variables.clone(),
            rows: Vec::new(),
            log_file: None,
            append_log: false,
            log_level: None,
            follow_remote_abort: false,
        }
    }
}

/// Answer of a status call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub running: bool,
    /// Outcome so far; final once `running` is false
    #[serde(default)]
    pub outcome: RunOutcome,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Unable to contact worker '{worker}': {message}")]
    Unreachable { worker: String, message: String },

    #[error("Worker '{worker}' rejected the request with status {status}: {message}")]
    Rejected {
        worker: String,
        status: u16,
        message: String,
    },

    #[error("Worker '{worker}' presented key {presented} but {trusted} is trusted")]
    Untrusted {
        worker: String,
        presented: String,
        trusted: String,
    },

    #[error("Unexpected response from worker '{worker}': {message}")]
    Protocol { worker: String, message: String },
}

impl WorkerError {
    pub fn worker(&self) -> &str {
        match self {
            WorkerError::Unreachable { worker, .. }
            | WorkerError::Rejected { worker, .. }
            | WorkerError::Untrusted { worker, .. }
            | WorkerError::Protocol { worker, .. } => worker,
        }
    }

    pub fn unreachable(worker: &WorkerDescriptor, message: impl Into<String>) -> Self {
        WorkerError::Unreachable {
            worker: worker.name.clone(),
            message: message.into(),
        }
    }
}

impl From<WorkerError> for PipeflowError {
    fn from(err: WorkerError) -> Self {
        let code = match &err {
            WorkerError::Unreachable { .. } => ErrorCode::REMOTE_UNREACHABLE,
            WorkerError::Rejected { .. } => ErrorCode::REMOTE_REJECTED,
            WorkerError::Untrusted { .. } => ErrorCode::REMOTE_UNTRUSTED,
            WorkerError::Protocol { .. } => ErrorCode::REMOTE_PROTOCOL,
        };
        let worker = err.worker().to_string();
        PipeflowError::remote(code, err.to_string(), Some(worker)).with_source(err)
    }
}

/// Client side of the worker API
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn submit(
        &self,
        worker: &WorkerDescriptor,
        request: &SubmitRequest,
    ) -> Result<RemoteHandle, WorkerError>;

    async fn status(
        &self,
        handle: &RemoteHandle,
        include_rows: bool,
    ) -> Result<WorkerStatus, WorkerError>;

    /// Final outcome of a finished submission
    async fn fetch_outcome(
        &self,
        handle: &RemoteHandle,
        include_rows: bool,
    ) -> Result<RunOutcome, WorkerError> {
        Ok(self.status(handle, include_rows).await?.outcome)
    }

    async fn abort(&self, handle: &RemoteHandle) -> Result<(), WorkerError>;

    /// Release worker-side resources held for the submission
    async fn cleanup(&self, handle: &RemoteHandle) -> Result<(), WorkerError>;

    /// Release server sockets a worker allocated for a pipeline run
    async fn release_sockets(
        &self,
        worker: &WorkerDescriptor,
        pipeline: &str,
        run_id: Option<&str>,
    ) -> Result<(), WorkerError>;
}
