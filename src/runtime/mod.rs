//! Pipeline runtime abstraction used by the local dispatch strategy

pub mod process;

pub use process::ProcessRuntime;

use crate::error::{ErrorCode, PipeflowError};
use crate::model::{PipelineDefinition, RunOutcome, VariableScope};
use async_trait::async_trait;
use std::fmt;

/// Identifies one started pipeline instance inside a runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuntimeHandle(pub u64);

impl fmt::Display for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local-{}", self.0)
    }
}

/// Final state of a finished pipeline instance
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeOutcome {
    pub outcome: RunOutcome,
    /// The pipeline explicitly produced its own result rows
    pub rows_set: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Unable to start pipeline '{pipeline}': {message}")]
    StartFailed { pipeline: String, message: String },

    #[error("Unknown pipeline instance {0}")]
    UnknownHandle(RuntimeHandle),

    #[error("Pipeline execution failed: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RuntimeError> for PipeflowError {
    fn from(err: RuntimeError) -> Self {
        let code = match &err {
            RuntimeError::StartFailed { .. } => ErrorCode::DISPATCH_RUNTIME_START,
            _ => ErrorCode::DISPATCH_RUNTIME_FAILED,
        };
        PipeflowError::dispatch_with_code(code, err.to_string(), Some("local".to_string()))
            .with_source(err)
    }
}

/// Runs pipeline instances in the current process or on this host
#[async_trait]
pub trait PipelineRuntime: Send + Sync {
    /// Start an instance; `prior` carries the input rows and files handed to it
    async fn start(
        &self,
        definition: &PipelineDefinition,
        arguments: &[String],
        scope: &VariableScope,
        prior: &RunOutcome,
    ) -> Result<RuntimeHandle, RuntimeError>;

    async fn is_finished(&self, handle: RuntimeHandle) -> bool;

    /// Errors accumulated so far
    async fn error_count(&self, handle: RuntimeHandle) -> u64;

    /// Ask every stage of the instance to stop
    async fn stop_all(&self, handle: RuntimeHandle);

    async fn wait_until_finished(&self, handle: RuntimeHandle) -> Result<(), RuntimeError>;

    /// Take the final outcome; the handle is released afterwards
    async fn collect_outcome(&self, handle: RuntimeHandle) -> Result<RuntimeOutcome, RuntimeError>;
}
