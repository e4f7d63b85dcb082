//! Decides how many times the child runs and which row each run is bound to

use crate::config::{CompatibilitySettings, OrchestratorConfig};
use crate::model::Row;

#[derive(Debug, Clone, PartialEq)]
pub enum IterationPlan {
    /// Per-row mode with an empty batch
    Skip,
    /// A single run, optionally bound to one row
    Once(Option<Row>),
    /// One run per input row, in order
    PerRow(Vec<Row>),
}

impl IterationPlan {
    pub fn len(&self) -> usize {
        match self {
            IterationPlan::Skip => 0,
            IterationPlan::Once(_) => 1,
            IterationPlan::PerRow(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_per_row(&self) -> bool {
        matches!(self, IterationPlan::PerRow(_))
    }

    /// The row bound to each iteration
    pub fn into_bound_rows(self) -> Vec<Option<Row>> {
        match self {
            IterationPlan::Skip => Vec::new(),
            IterationPlan::Once(row) => vec![row],
            IterationPlan::PerRow(rows) => rows.into_iter().map(Some).collect(),
        }
    }
}

pub fn plan_iterations(
    config: &OrchestratorConfig,
    input: &[Row],
    compatibility: &CompatibilitySettings,
) -> IterationPlan {
    if config.run_once_per_row {
        if !input.is_empty() {
            return IterationPlan::PerRow(input.to_vec());
        }
        return if compatibility.run_once_on_empty_input {
            IterationPlan::Once(None)
        } else {
            IterationPlan::Skip
        };
    }

    let row = if config.reads_previous_row() {
        input.first().cloned()
    } else {
        None
    };
    IterationPlan::Once(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PipelineReference;

    fn rows() -> Vec<Row> {
        vec![
            Row::new().with_field("id", 1),
            Row::new().with_field("id", 2),
        ]
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::new("entry", PipelineReference::by_path("child.yml"))
    }

    #[test]
    fn test_single_run_ignores_rows() {
        let plan = plan_iterations(&config(), &rows(), &CompatibilitySettings::default());
        assert_eq!(plan, IterationPlan::Once(None));
    }

    #[test]
    fn test_single_run_binds_first_row_when_reading_rows() {
        let mut config = config();
        config.parameters_from_previous_row = true;

        let plan = plan_iterations(&config, &rows(), &CompatibilitySettings::default());
        assert_eq!(plan, IterationPlan::Once(Some(rows()[0].clone())));
    }

    #[test]
    fn test_per_row_runs_once_per_row() {
        let mut config = config();
        config.run_once_per_row = true;

        let plan = plan_iterations(&config, &rows(), &CompatibilitySettings::default());
        assert!(plan.is_per_row());
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_empty_batch_skips_by_default() {
        let mut config = config();
        config.run_once_per_row = true;

        let plan = plan_iterations(&config, &[], &CompatibilitySettings::default());
        assert!(plan.is_empty());
        assert!(plan.into_bound_rows().is_empty());
    }

    #[test]
    fn test_empty_batch_runs_once_in_compatibility_mode() {
        let mut config = config();
        config.run_once_per_row = true;
        let compatibility = CompatibilitySettings {
            run_once_on_empty_input: true,
            ..CompatibilitySettings::default()
        };

        let plan = plan_iterations(&config, &[], &compatibility);
        assert_eq!(plan.into_bound_rows(), vec![None]);
    }
}
