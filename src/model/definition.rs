//! Loaded, ready-to-run child pipeline definitions

use super::{ResolvedLocation, Topology, VariableScope};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A named parameter the child pipeline declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// External program the process runtime launches for this pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A child pipeline as returned by a definition store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,
    #[serde(default)]
    pub variables: VariableScope,
    /// Static cluster topology embedded in the definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<Topology>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSpec>,
    /// Where the store found this definition
    #[serde(skip)]
    pub location: Option<ResolvedLocation>,
    /// Values activated for declared parameters for the current run
    #[serde(skip)]
    parameter_values: BTreeMap<String, String>,
}

impl PipelineDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            parameters: Vec::new(),
            variables: VariableScope::new(),
            topology: None,
            command: None,
            location: None,
            parameter_values: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, declaration: ParameterDeclaration) -> Self {
        self.parameters.push(declaration);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.set(name, value);
        self
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    pub fn declares_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    pub fn clear_parameter_values(&mut self) {
        self.parameter_values.clear();
    }

    pub fn set_parameter_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameter_values.insert(name.into(), value.into());
    }

    pub fn parameter_value(&self, name: &str) -> Option<&str> {
        self.parameter_values.get(name).map(String::as_str)
    }

    /// Effective value per declared parameter: activated value, then declared
    /// default, then the definition's variable of the same name, else empty.
    pub fn effective_parameters(&self) -> BTreeMap<String, String> {
        self.parameters
            .iter()
            .map(|decl| {
                let value = self
                    .parameter_values
                    .get(&decl.name)
                    .filter(|v| !v.is_empty())
                    .cloned()
                    .or_else(|| decl.default.clone().filter(|v| !v.is_empty()))
                    .or_else(|| self.variables.get(&decl.name).map(str::to_string))
                    .unwrap_or_default();
                (decl.name.clone(), value)
            })
            .collect()
    }

    /// Variables plus effective parameters, parameters taking precedence
    pub fn runtime_scope(&self) -> VariableScope {
        let mut scope = self.variables.clone();
        for (name, value) in self.effective_parameters() {
            scope.set(name, value);
        }
        scope
    }

    /// Folder the definition was loaded from, used as the "current directory"
    pub fn current_directory(&self) -> Option<String> {
        match self.location.as_ref()? {
            ResolvedLocation::Path(path) => Path::new(path)
                .parent()
                .map(|p| p.to_string_lossy().into_owned()),
            ResolvedLocation::Stored { directory, .. } => Some(directory.clone()),
            ResolvedLocation::Id(_) => None,
        }
    }
}
