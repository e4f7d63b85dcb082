//! Variable scopes and `${VAR}` substitution
//!
//! A [`VariableScope`] is an ordered name → value map. Parent workflows, entries and
//! child pipelines each own one; the binder and resolver move values between them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Regex for braced variable references `${NAME}`
static BRACED_VAR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.\-]*)\}").expect("Valid regex pattern"));

/// Variable set to the folder the resolved child definition lives in
pub const CURRENT_DIRECTORY_VAR: &str = "PIPEFLOW_CURRENT_DIRECTORY";

/// Variable set to the name of the resolved child definition
pub const PIPELINE_NAME_VAR: &str = "PIPEFLOW_PIPELINE_NAME";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableScope {
    values: BTreeMap<String, String>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope from the current process environment
    pub fn from_env() -> Self {
        std::env::vars().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value for `name` when it is set and non-empty
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Overwrite variables this scope already declares with values from `other`.
    ///
    /// Names `other` does not know are left untouched; names only `other` knows are
    /// not added.
    pub fn overlay_declared(&mut self, other: &VariableScope) {
        for (name, value) in self.values.iter_mut() {
            if let Some(parent_value) = other.values.get(name) {
                *value = parent_value.clone();
            }
        }
    }

    /// Copy every variable of `other` this scope does not declare yet
    pub fn add_missing(&mut self, other: &VariableScope) {
        for (name, value) in &other.values {
            self.values
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Expand `${NAME}` references from this scope.
    ///
    /// Unknown references are left in place so a later scope can still resolve them.
    pub fn substitute(&self, template: &str) -> String {
        if !template.contains("${") {
            return template.to_string();
        }
        BRACED_VAR_REGEX
            .replace_all(template, |caps: &regex::Captures<'_>| {
                match self.values.get(&caps[1]) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Substitute an optional template, mapping `None` to `None`
    pub fn substitute_opt(&self, template: Option<&str>) -> Option<String> {
        template.map(|t| self.substitute(t))
    }
}

impl FromIterator<(String, String)> for VariableScope {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for VariableScope {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl From<BTreeMap<String, String>> for VariableScope {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl From<VariableScope> for BTreeMap<String, String> {
    fn from(scope: VariableScope) -> Self {
        scope.values
    }
}
