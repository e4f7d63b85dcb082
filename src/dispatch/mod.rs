//! Dispatch strategies: running one bound child pipeline locally, on one
//! remote worker, or across a cluster, behind a single contract.

pub mod cancel;
pub mod clustered;
pub mod local;
pub mod remote;
pub mod ticker;

pub use cancel::{CancelSignal, CancellationFlag, NeverCancelled};
pub use clustered::ClusteredStrategy;
pub use local::LocalStrategy;
pub use remote::RemoteStrategy;
pub use ticker::{Ticker, TokioTicker, VirtualTicker};

use crate::config::{LogLevel, OrchestratorConfig};
use crate::error::{ErrorCode, PipeflowError};
use crate::hook::StrategyTarget;
use crate::model::{PipelineDefinition, RunOutcome, VariableScope, WorkerRegistry};
use crate::remote::WorkerError;
use crate::runtime::RuntimeError;
use async_trait::async_trait;
use std::fmt;

/// The closed set of execution strategies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyTag {
    Local,
    /// Run on the named worker (name may contain variables)
    RemoteSingle(String),
    Clustered,
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyTag::Local => write!(f, "local"),
            StrategyTag::RemoteSingle(worker) => write!(f, "remote:{}", worker),
            StrategyTag::Clustered => write!(f, "clustered"),
        }
    }
}

/// Pick the execution strategy.
///
/// A run-configuration hook target always wins. Without one, the clustering
/// flag beats a configured remote worker, and local execution is the default.
pub fn resolve_strategy(config: &OrchestratorConfig, hook: Option<&StrategyTarget>) -> StrategyTag {
    if let Some(target) = hook {
        return match target {
            StrategyTarget::Local => StrategyTag::Local,
            StrategyTarget::Remote(worker) => StrategyTag::RemoteSingle(worker.clone()),
            StrategyTarget::Clustered => StrategyTag::Clustered,
        };
    }

    if config.use_cluster {
        return StrategyTag::Clustered;
    }

    match config.remote_worker.as_deref().map(str::trim) {
        Some(worker) if !worker.is_empty() => StrategyTag::RemoteSingle(worker.to_string()),
        _ => StrategyTag::Local,
    }
}

/// Log file settings forwarded to workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogForwarding {
    pub file: String,
    pub append: bool,
    pub level: LogLevel,
}

/// Everything a strategy needs for one dispatch
pub struct DispatchRequest<'a> {
    /// Name of the entry in the parent workflow
    pub entry: &'a str,
    pub target: &'a StrategyTag,
    /// Definition with this iteration's parameters activated
    pub definition: &'a PipelineDefinition,
    pub arguments: &'a [String],
    /// Outcome handed to the child as its input
    pub prior: &'a RunOutcome,
    pub config: &'a OrchestratorConfig,
    /// Scope of the entry, used to substitute worker names
    pub parent_scope: &'a VariableScope,
    pub workers: &'a WorkerRegistry,
    /// Drop row payloads from remote outcomes
    pub suppress_rows: bool,
    pub log: Option<&'a LogForwarding>,
    pub cancel: &'a dyn CancelSignal,
}

/// What a strategy hands back to the aggregator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub outcome: RunOutcome,
    /// The child produced or observed rows that should replace the running set
    pub rows_observed: bool,
    /// Cancellation was observed during the dispatch
    pub cancelled: bool,
}

impl DispatchReport {
    pub fn new(outcome: RunOutcome, rows_observed: bool) -> Self {
        Self {
            outcome,
            rows_observed,
            cancelled: false,
        }
    }
}

/// Failures that prevented a strategy from producing an outcome at all
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("No remote worker configured")]
    NoWorker,

    #[error("Unable to find remote worker '{0}'")]
    UnknownWorker(String),

    #[error("Unable to submit pipeline to worker '{worker}'")]
    Submit {
        worker: String,
        #[source]
        source: WorkerError,
    },

    #[error("The {strategy} strategy cannot run target {target}")]
    Misrouted {
        strategy: &'static str,
        target: String,
    },
}

impl From<DispatchError> for PipeflowError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Runtime(inner) => inner.into(),
            DispatchError::Submit { worker, source } => PipeflowError::remote(
                ErrorCode::REMOTE_SUBMIT_FAILED,
                format!("Unable to submit pipeline to worker '{}'", worker),
                Some(worker),
            )
            .with_source(source),
            other => {
                let code = match &other {
                    DispatchError::UnknownWorker(_) | DispatchError::NoWorker => {
                        ErrorCode::DISPATCH_UNKNOWN_WORKER
                    }
                    _ => ErrorCode::DISPATCH_GENERIC,
                };
                PipeflowError::dispatch_with_code(code, other.to_string(), None).with_source(other)
            }
        }
    }
}

#[async_trait]
pub trait DispatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch(&self, request: DispatchRequest<'_>) -> Result<DispatchReport, DispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PipelineReference;

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::new("entry", PipelineReference::by_path("child.yml"))
    }

    #[test]
    fn test_default_is_local() {
        assert_eq!(resolve_strategy(&config(), None), StrategyTag::Local);

        let mut blank_worker = config();
        blank_worker.remote_worker = Some("  ".to_string());
        assert_eq!(resolve_strategy(&blank_worker, None), StrategyTag::Local);
    }

    #[test]
    fn test_cluster_flag_beats_remote_worker() {
        let mut config = config();
        config.remote_worker = Some("etl-1".to_string());
        assert_eq!(
            resolve_strategy(&config, None),
            StrategyTag::RemoteSingle("etl-1".to_string())
        );

        config.use_cluster = true;
        assert_eq!(resolve_strategy(&config, None), StrategyTag::Clustered);
    }

    #[test]
    fn test_hook_target_wins() {
        let mut config = config();
        config.use_cluster = true;
        assert_eq!(
            resolve_strategy(&config, Some(&StrategyTarget::Local)),
            StrategyTag::Local
        );
        assert_eq!(
            resolve_strategy(&config, Some(&StrategyTarget::Remote("etl-2".to_string()))),
            StrategyTag::RemoteSingle("etl-2".to_string())
        );
    }

    #[test]
    fn test_dispatch_error_conversion() {
        let err: PipeflowError = DispatchError::UnknownWorker("etl-9".to_string()).into();
        assert_eq!(err.code(), ErrorCode::DISPATCH_UNKNOWN_WORKER);
        assert_eq!(err.exit_code(), 5);
    }
}
