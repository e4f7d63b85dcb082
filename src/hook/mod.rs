//! Run-configuration hooks: late decisions on where a child pipeline runs

pub mod named;

pub use named::NamedRunConfigurations;

use crate::error::{ErrorCode, PipeflowError};
use crate::model::{PipelineDefinition, VariableScope};
use std::fmt;
use std::str::FromStr;

/// Where a hook wants the child to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyTarget {
    Local,
    Remote(String),
    Clustered,
}

impl fmt::Display for StrategyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyTarget::Local => write!(f, "local"),
            StrategyTarget::Remote(worker) => write!(f, "remote:{}", worker),
            StrategyTarget::Clustered => write!(f, "clustered"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookDecision {
    /// Skip the child entirely; the invocation succeeds with nothing run
    Veto,
    Target(StrategyTarget),
}

impl FromStr for HookDecision {
    type Err = HookError;

    /// Parses `local`, `remote:<worker>`, `clustered` or `disabled`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        match value.to_ascii_lowercase().as_str() {
            "local" => return Ok(HookDecision::Target(StrategyTarget::Local)),
            "clustered" => return Ok(HookDecision::Target(StrategyTarget::Clustered)),
            "disabled" => return Ok(HookDecision::Veto),
            _ => {}
        }

        match value.split_once(':') {
            Some((kind, worker)) if kind.eq_ignore_ascii_case("remote") && !worker.trim().is_empty() => {
                Ok(HookDecision::Target(StrategyTarget::Remote(worker.trim().to_string())))
            }
            _ => Err(HookError::Invalid {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Unknown run configuration '{0}'")]
    UnknownConfiguration(String),

    #[error("Invalid run configuration target '{value}'")]
    Invalid { value: String },

    #[error("Run configuration hook failed: {0}")]
    Failed(String),
}

impl From<HookError> for PipeflowError {
    fn from(err: HookError) -> Self {
        PipeflowError::dispatch_with_code(ErrorCode::DISPATCH_HOOK_FAILED, err.to_string(), None)
            .with_source(err)
    }
}

/// Consulted once per invocation, after the definition is resolved
pub trait RunConfigurationHook: Send + Sync {
    /// `Ok(None)` leaves the statically configured strategy in place
    fn resolve(
        &self,
        run_configuration: Option<&str>,
        definition: &PipelineDefinition,
        scope: &VariableScope,
    ) -> Result<Option<HookDecision>, HookError>;
}

/// Hook that never has an opinion
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHook;

impl RunConfigurationHook for NoHook {
    fn resolve(
        &self,
        _run_configuration: Option<&str>,
        _definition: &PipelineDefinition,
        _scope: &VariableScope,
    ) -> Result<Option<HookDecision>, HookError> {
        Ok(None)
    }
}
