use super::{HookDecision, HookError, RunConfigurationHook};
use crate::model::{PipelineDefinition, VariableScope};
use std::collections::BTreeMap;
use tracing::debug;

/// Hook backed by the `run_configurations` table of the settings.
///
/// Each entry maps a name to `local`, `remote:<worker>`, `clustered` or
/// `disabled`.
#[derive(Debug, Clone, Default)]
pub struct NamedRunConfigurations {
    entries: BTreeMap<String, String>,
}

impl NamedRunConfigurations {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl RunConfigurationHook for NamedRunConfigurations {
    fn resolve(
        &self,
        run_configuration: Option<&str>,
        definition: &PipelineDefinition,
        scope: &VariableScope,
    ) -> Result<Option<HookDecision>, HookError> {
        let name = match scope.substitute_opt(run_configuration) {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Ok(None),
        };

        let value = self
            .entries
            .get(name.trim())
            .ok_or_else(|| HookError::UnknownConfiguration(name.clone()))?;
        let decision = value.parse::<HookDecision>()?;
        debug!(
            "Run configuration '{}' sends pipeline '{}' to {:?}",
            name, definition.name, decision
        );
        Ok(Some(decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::StrategyTarget;

    fn hook() -> NamedRunConfigurations {
        let mut entries = BTreeMap::new();
        entries.insert("nightly".to_string(), "clustered".to_string());
        entries.insert("offload".to_string(), "remote:etl-1".to_string());
        entries.insert("off".to_string(), "disabled".to_string());
        NamedRunConfigurations::new(entries)
    }

    #[test]
    fn test_no_configuration_means_no_opinion() {
        let def = PipelineDefinition::new("child");
        let scope = VariableScope::new();
        assert_eq!(hook().resolve(None, &def, &scope).unwrap(), None);
        assert_eq!(hook().resolve(Some(" "), &def, &scope).unwrap(), None);
    }

    #[test]
    fn test_named_configuration_is_substituted() {
        let def = PipelineDefinition::new("child");
        let mut scope = VariableScope::new();
        scope.set("RUN_CONFIG", "offload");

        let decision = hook().resolve(Some("${RUN_CONFIG}"), &def, &scope).unwrap();
        assert_eq!(
            decision,
            Some(HookDecision::Target(StrategyTarget::Remote("etl-1".to_string())))
        );
    }

    #[test]
    fn test_disabled_configuration_vetoes() {
        let def = PipelineDefinition::new("child");
        let decision = hook().resolve(Some("off"), &def, &VariableScope::new()).unwrap();
        assert_eq!(decision, Some(HookDecision::Veto));
    }

    #[test]
    fn test_unknown_configuration_is_an_error() {
        let def = PipelineDefinition::new("child");
        let err = hook()
            .resolve(Some("weekly"), &def, &VariableScope::new())
            .unwrap_err();
        assert!(matches!(err, HookError::UnknownConfiguration(name) if name == "weekly"));
    }
}
