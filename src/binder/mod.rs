//! Scope Binder
//!
//! Builds the child's parameters and positional arguments for one iteration.
//! A binder lives for one invocation so values bound in an earlier iteration
//! can be reset when their source field turns up empty.

pub mod pure;

use crate::config::{OrchestratorConfig, ParameterBinding};
use crate::error::{ErrorCode, PipeflowError};
use crate::model::{PipelineDefinition, Row, VariableScope};
use pure::BoundValue;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Non-fatal binding problems; recorded and logged, the iteration continues
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("Pipeline '{pipeline}' does not declare parameter '{name}'")]
    UnknownParameter { name: String, pipeline: String },

    #[error("Input row has no field '{field}' for parameter '{name}'")]
    MissingField { name: String, field: String },
}

impl From<BindingError> for PipeflowError {
    fn from(err: BindingError) -> Self {
        let (code, name) = match &err {
            BindingError::UnknownParameter { name, .. } => {
                (ErrorCode::BINDING_UNKNOWN_PARAMETER, name.clone())
            }
            BindingError::MissingField { name, .. } => (ErrorCode::BINDING_GENERIC, name.clone()),
        };
        PipeflowError::binding(code, err.to_string(), Some(name)).with_source(err)
    }
}

/// Parameters and arguments for one iteration of the child
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildScope {
    /// Explicitly bound parameter values; absent names inherit
    pub parameters: BTreeMap<String, String>,
    pub arguments: Vec<String>,
    /// Row this iteration was bound to, if any
    pub row: Option<Row>,
    pub binding_errors: Vec<BindingError>,
}

impl ChildScope {
    /// Activate the bound values on `definition`.
    ///
    /// Declared parameters receive their value; undeclared bindings are passed
    /// through as plain variables.
    pub fn apply_to(&self, definition: &mut PipelineDefinition) {
        definition.clear_parameter_values();
        for (name, value) in &self.parameters {
            if definition.declares_parameter(name) {
                definition.set_parameter_value(name.clone(), value.clone());
            } else {
                definition.variables.set(name.clone(), value.clone());
            }
        }
    }
}

pub struct ScopeBinder {
    bindings: Vec<ParameterBinding>,
    parent_scope: VariableScope,
    static_arguments: Vec<String>,
    arguments_from_row: bool,
    /// Values bound in earlier iterations of this invocation
    bound: VariableScope,
}

impl ScopeBinder {
    /// Prepare a binder; static arguments are substituted here, once
    pub fn new(
        config: &OrchestratorConfig,
        parent_scope: &VariableScope,
        parent_arguments: &[String],
    ) -> Self {
        Self {
            bindings: config.parameters.clone(),
            parent_scope: parent_scope.clone(),
            static_arguments: pure::static_arguments(
                &config.arguments,
                parent_arguments,
                parent_scope,
            ),
            arguments_from_row: config.arguments_from_previous_row,
            bound: VariableScope::new(),
        }
    }

    pub fn static_arguments(&self) -> &[String] {
        &self.static_arguments
    }

    pub fn bind(&mut self, definition: &PipelineDefinition, row: Option<&Row>) -> ChildScope {
        let mut scope = ChildScope {
            row: row.cloned(),
            ..ChildScope::default()
        };

        for binding in &self.bindings {
            if binding.name.trim().is_empty() {
                continue;
            }

            if !definition.declares_parameter(&binding.name) {
                let err = BindingError::UnknownParameter {
                    name: binding.name.clone(),
                    pipeline: definition.name.clone(),
                };
                warn!("{}", err);
                scope.binding_errors.push(err);
            }

            let row_value = match (pure::source_field(binding), row) {
                (Some(field), Some(row)) => {
                    if row.get(field).is_none() {
                        let err = BindingError::MissingField {
                            name: binding.name.clone(),
                            field: field.to_string(),
                        };
                        warn!("{}", err);
                        scope.binding_errors.push(err);
                    }
                    row.get_string(field)
                }
                _ => None,
            };

            let previous = self.bound.get(&binding.name);
            match pure::resolve_parameter(binding, row_value.as_deref(), previous, &self.parent_scope)
            {
                BoundValue::Set(value) => {
                    debug!(parameter = %binding.name, value = %value, "Bound parameter");
                    self.bound.set(binding.name.clone(), value.clone());
                    scope.parameters.insert(binding.name.clone(), value);
                }
                BoundValue::Inherit => {}
            }
        }

        scope.arguments = if self.arguments_from_row {
            row.map(pure::arguments_from_row).unwrap_or_default()
        } else {
            self.static_arguments.clone()
        };

        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParameterDeclaration, PipelineReference};

    fn definition() -> PipelineDefinition {
        PipelineDefinition::new("child")
            .with_parameter(ParameterDeclaration::new("P"))
            .with_parameter(ParameterDeclaration::new("Q").with_default("q-default"))
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::new("entry", PipelineReference::by_path("child.yml"))
    }

    #[test]
    fn test_stale_value_reset_across_iterations() {
        let config = config().with_parameter(ParameterBinding::from_field("P", "f"));
        let mut binder = ScopeBinder::new(&config, &VariableScope::new(), &[]);
        let definition = definition();

        let first = binder.bind(&definition, Some(&Row::new().with_field("f", "A")));
        assert_eq!(first.parameters["P"], "A");

        let second = binder.bind(&definition, Some(&Row::new().with_field("f", "")));
        assert_eq!(second.parameters["P"], "");
    }

    #[test]
    fn test_first_empty_field_inherits() {
        let config = config().with_parameter(ParameterBinding::from_field("P", "f"));
        let mut binder = ScopeBinder::new(&config, &VariableScope::new(), &[]);

        let scope = binder.bind(&definition(), Some(&Row::new().with_field("f", "")));
        assert!(!scope.parameters.contains_key("P"));
    }

    #[test]
    fn test_static_value_wins_over_field() {
        let config =
            config().with_parameter(ParameterBinding::from_field("P", "f").with_value("S"));
        let mut binder = ScopeBinder::new(&config, &VariableScope::new(), &[]);

        let scope = binder.bind(&definition(), Some(&Row::new().with_field("f", "R")));
        assert_eq!(scope.parameters["P"], "S");
    }

    #[test]
    fn test_unknown_parameter_is_reported_and_passed_through() {
        let config = config().with_parameter(ParameterBinding::from_value("EXTRA", "x"));
        let mut binder = ScopeBinder::new(&config, &VariableScope::new(), &[]);
        let mut definition = definition();

        let scope = binder.bind(&definition, None);
        assert!(matches!(
            scope.binding_errors.as_slice(),
            [BindingError::UnknownParameter { .. }]
        ));

        scope.apply_to(&mut definition);
        assert_eq!(definition.variables.get("EXTRA"), Some("x"));
        assert!(!definition.declares_parameter("EXTRA"));
    }

    #[test]
    fn test_missing_field_is_reported() {
        let config = config().with_parameter(ParameterBinding::from_field("P", "absent"));
        let mut binder = ScopeBinder::new(&config, &VariableScope::new(), &[]);

        let scope = binder.bind(&definition(), Some(&Row::new().with_field("f", "A")));
        assert!(matches!(
            scope.binding_errors.as_slice(),
            [BindingError::MissingField { .. }]
        ));
    }

    #[test]
    fn test_arguments_from_row_or_static() {
        let parent: VariableScope = [("DAY", "mon")].into_iter().collect();
        let row = Row::new().with_field("a", "1").with_field("b", "2");

        let static_config = config().with_arguments(["${DAY}", "full"]);
        let mut binder = ScopeBinder::new(&static_config, &parent, &[]);
        assert_eq!(binder.bind(&definition(), Some(&row)).arguments, vec!["mon", "full"]);

        let mut row_config = config();
        row_config.arguments_from_previous_row = true;
        let mut binder = ScopeBinder::new(&row_config, &parent, &[]);
        assert_eq!(binder.bind(&definition(), Some(&row)).arguments, vec!["1", "2"]);
        assert!(binder.bind(&definition(), None).arguments.is_empty());
    }

    #[test]
    fn test_apply_sets_declared_parameters() {
        let config = config()
            .with_parameter(ParameterBinding::from_value("P", "p-value"))
            .with_parameter(ParameterBinding::from_value("Q", ""));
        let mut binder = ScopeBinder::new(&config, &VariableScope::new(), &[]);
        let mut definition = definition();

        binder.bind(&definition, None).apply_to(&mut definition);
        let effective = definition.effective_parameters();
        assert_eq!(effective["P"], "p-value");
        assert_eq!(effective["Q"], "q-default");
    }
}
