//! `pipeflow inspect`

use crate::cli::validation::validate_entry_file;
use crate::config::{OrchestratorConfig, ParameterBinding};
use crate::dispatch::resolve_strategy;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// What an entry would do, without resolving or running anything
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub entry: String,
    pub reference_kind: String,
    pub reference: String,
    pub bindings: Vec<ParameterBinding>,
    pub arguments: Vec<String>,
    pub run_once_per_row: bool,
    /// Strategy chosen when no run configuration hook intervenes
    pub strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_configuration: Option<String>,
}

impl InspectReport {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            entry: config.name.clone(),
            reference_kind: config.reference.effective_kind().to_string(),
            reference: config.reference.to_string(),
            bindings: config.parameters.clone(),
            arguments: config.arguments.clone(),
            run_once_per_row: config.run_once_per_row,
            strategy: resolve_strategy(config, None).to_string(),
            run_configuration: config.run_configuration.clone(),
        }
    }
}

pub async fn inspect_entry(path: &Path) -> Result<InspectReport> {
    validate_entry_file(path)?;
    let config = OrchestratorConfig::load(path)
        .await
        .with_context(|| format!("Failed to load entry {}", path.display()))?;
    Ok(InspectReport::from_config(&config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PipelineReference;

    #[test]
    fn test_report_shows_static_strategy() {
        let mut config = OrchestratorConfig::new("load", PipelineReference::by_name("load", "/etl"))
            .with_parameter(ParameterBinding::from_field("P", "id"));
        config.remote_worker = Some("etl-1".to_string());

        let report = InspectReport::from_config(&config);
        assert_eq!(report.strategy, "remote:etl-1");
        assert_eq!(report.bindings.len(), 1);
        assert_eq!(report.reference_kind, config.reference.effective_kind().to_string());
    }
}
