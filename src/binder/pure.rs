//! Pure parameter precedence rules
//!
//! No I/O and no state: the binder feeds in the row value and the value bound
//! in the previous iteration, and gets back what the child should see.

use crate::config::ParameterBinding;
use crate::model::VariableScope;

/// What a binding resolves to for one iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
    /// Set the parameter to this value (possibly empty)
    Set(String),
    /// Leave the parameter unset so it falls back to the inherited value
    Inherit,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Field configured for the binding, if any (blank counts as none)
pub fn source_field(binding: &ParameterBinding) -> Option<&str> {
    non_empty(binding.source_field.as_deref())
}

/// Resolve one parameter binding.
///
/// Precedence, highest first:
/// 1. a non-empty row value for the configured field, unless a non-empty static
///    value is present, in which case the static value wins
/// 2. the static value, which may be empty
/// 3. the inherited value
///
/// A field-mapped parameter that carried a non-empty value in the previous
/// iteration and has no value now is reset to empty instead of inheriting.
///
/// # Examples
///
/// ```
/// use pipeflow::binder::pure::{resolve_parameter, BoundValue};
/// use pipeflow::config::ParameterBinding;
/// use pipeflow::model::VariableScope;
///
/// let binding = ParameterBinding::from_field("P", "f").with_value("S");
/// let bound = resolve_parameter(&binding, Some("R"), None, &VariableScope::new());
/// assert_eq!(bound, BoundValue::Set("S".to_string()));
/// ```
pub fn resolve_parameter(
    binding: &ParameterBinding,
    row_value: Option<&str>,
    previous: Option<&str>,
    scope: &VariableScope,
) -> BoundValue {
    let static_value = binding.value.as_deref().map(|v| scope.substitute(v));

    if source_field(binding).is_none() {
        return match static_value {
            Some(value) => BoundValue::Set(value),
            None => BoundValue::Inherit,
        };
    }

    if let Some(row_value) = non_empty(row_value) {
        return match static_value.filter(|v| !v.trim().is_empty()) {
            Some(value) => BoundValue::Set(value),
            None => BoundValue::Set(row_value.to_string()),
        };
    }

    match static_value {
        Some(value) => BoundValue::Set(value),
        None if non_empty(previous).is_some() => BoundValue::Set(String::new()),
        None => BoundValue::Inherit,
    }
}

/// Positional arguments taken from a row, in field order
pub fn arguments_from_row(row: &crate::model::Row) -> Vec<String> {
    row.values_as_strings()
}

/// Static arguments, falling back to the parent's when none are configured,
/// substituted once against `scope`
pub fn static_arguments(
    configured: &[String],
    parent_arguments: &[String],
    scope: &VariableScope,
) -> Vec<String> {
    let source = if configured.is_empty() {
        parent_arguments
    } else {
        configured
    };
    source.iter().map(|a| scope.substitute(a)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;

    fn scope() -> VariableScope {
        [("REGION", "EU")].into_iter().collect()
    }

    #[test]
    fn test_static_value_beats_row_value() {
        let binding = ParameterBinding::from_field("P", "f").with_value("S");
        assert_eq!(
            resolve_parameter(&binding, Some("R"), None, &scope()),
            BoundValue::Set("S".to_string())
        );
    }

    #[test]
    fn test_row_value_used_without_static_value() {
        let binding = ParameterBinding::from_field("P", "f");
        assert_eq!(
            resolve_parameter(&binding, Some("R"), None, &scope()),
            BoundValue::Set("R".to_string())
        );

        let binding = ParameterBinding::from_field("P", "f").with_value("");
        assert_eq!(
            resolve_parameter(&binding, Some("R"), None, &scope()),
            BoundValue::Set("R".to_string())
        );
    }

    #[test]
    fn test_static_value_is_substituted() {
        let binding = ParameterBinding::from_value("P", "${REGION}-1");
        assert_eq!(
            resolve_parameter(&binding, None, None, &scope()),
            BoundValue::Set("EU-1".to_string())
        );
    }

    #[test]
    fn test_empty_static_value_is_still_set() {
        let binding = ParameterBinding::from_value("P", "");
        assert_eq!(
            resolve_parameter(&binding, None, Some("old"), &scope()),
            BoundValue::Set(String::new())
        );
    }

    #[test]
    fn test_unconfigured_binding_inherits() {
        let binding = ParameterBinding {
            name: "P".to_string(),
            source_field: Some("  ".to_string()),
            value: None,
        };
        assert_eq!(
            resolve_parameter(&binding, Some("R"), Some("old"), &scope()),
            BoundValue::Inherit
        );
    }

    #[test]
    fn test_stale_value_reset() {
        let binding = ParameterBinding::from_field("P", "f");
        assert_eq!(
            resolve_parameter(&binding, Some(""), Some("A"), &scope()),
            BoundValue::Set(String::new())
        );
        assert_eq!(
            resolve_parameter(&binding, None, Some(""), &scope()),
            BoundValue::Inherit
        );
    }

    #[test]
    fn test_static_arguments_fall_back_to_parent() {
        let parent = vec!["${REGION}".to_string(), "x".to_string()];
        assert_eq!(static_arguments(&[], &parent, &scope()), vec!["EU", "x"]);

        let configured = vec!["own".to_string()];
        assert_eq!(static_arguments(&configured, &parent, &scope()), vec!["own"]);
    }

    #[test]
    fn test_arguments_from_row_follow_field_order() {
        let row = Row::new()
            .with_field("b", "2")
            .with_field("a", 1)
            .with_field("c", serde_json::Value::Null);
        assert_eq!(arguments_from_row(&row), vec!["2", "1", ""]);
    }
}
