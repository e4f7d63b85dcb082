//! Durable entry definition: one configured use of the orchestrator inside a
//! parent workflow.

use crate::error::{common, ErrorCode, PipeflowError, Result};
use crate::model::PipelineReference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

fn default_true() -> bool {
    true
}

fn default_log_extension() -> String {
    "log".to_string()
}

/// Maps one named parameter of the child pipeline to its value source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBinding {
    pub name: String,
    /// Field of the current input row supplying the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,
    /// Static value; may be the empty string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ParameterBinding {
    pub fn from_field(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_field: Some(field.into()),
            value: None,
        }
    }

    pub fn from_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_field: None,
            value: Some(value.into()),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Severity threshold for the per-invocation log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Whether an event at `level` passes this threshold
    pub fn admits(self, level: LogLevel) -> bool {
        level <= self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

/// Optional log file written for each invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileConfig {
    pub base_name: String,
    #[serde(default = "default_log_extension")]
    pub extension: String,
    #[serde(default)]
    pub add_date: bool,
    #[serde(default)]
    pub add_time: bool,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub create_parent_folder: bool,
    #[serde(default)]
    pub level: LogLevel,
}

impl LogFileConfig {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            extension: default_log_extension(),
            add_date: false,
            add_time: false,
            append: false,
            create_parent_folder: false,
            level: LogLevel::default(),
        }
    }
}

/// Serialization format of an entry file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yml" | "yaml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            "toml" => Some(ConfigFormat::Toml),
            _ => None,
        }
    }
}

/// Everything that configures one orchestrator invocation.
///
/// Immutable for the duration of a run. The reference fields are flattened so
/// an entry reads `path: etl/load.yml` rather than nesting a reference block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Name of this entry in the parent workflow
    pub name: String,
    #[serde(flatten)]
    pub reference: PipelineReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterBinding>,
    #[serde(default)]
    pub run_once_per_row: bool,
    #[serde(default)]
    pub arguments_from_previous_row: bool,
    #[serde(default)]
    pub parameters_from_previous_row: bool,
    #[serde(default = "default_true")]
    pub inherit_all_parent_variables: bool,
    #[serde(default)]
    pub clear_rows_before_run: bool,
    #[serde(default)]
    pub clear_files_before_run: bool,
    #[serde(default = "default_true")]
    pub wait_for_completion: bool,
    #[serde(default)]
    pub follow_remote_abort: bool,
    #[serde(default)]
    pub suppress_remote_row_data: bool,
    #[serde(default)]
    pub use_cluster: bool,
    #[serde(default)]
    pub log_remote_work: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_worker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_configuration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogFileConfig>,
}

impl OrchestratorConfig {
    pub fn new(name: impl Into<String>, reference: PipelineReference) -> Self {
        Self {
            name: name.into(),
            reference,
            arguments: Vec::new(),
            parameters: Vec::new(),
            run_once_per_row: false,
            arguments_from_previous_row: false,
            parameters_from_previous_row: false,
            inherit_all_parent_variables: true,
            clear_rows_before_run: false,
            clear_files_before_run: false,
            wait_for_completion: true,
            follow_remote_abort: false,
            suppress_remote_row_data: false,
            use_cluster: false,
            log_remote_work: false,
            remote_worker: None,
            run_configuration: None,
            log: None,
        }
    }

    pub fn with_parameter(mut self, binding: ParameterBinding) -> Self {
        self.parameters.push(binding);
        self
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    /// Whether any input row is consumed by binding
    pub fn reads_previous_row(&self) -> bool {
        self.arguments_from_previous_row || self.parameters_from_previous_row
    }

    /// Structural checks done when an entry file is loaded
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PipeflowError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                "Entry name must not be empty",
            ));
        }

        let mut seen = BTreeSet::new();
        for binding in &self.parameters {
            if binding.name.trim().is_empty() {
                return Err(PipeflowError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("Entry '{}' has a parameter binding without a name", self.name),
                ));
            }
            if !seen.insert(binding.name.as_str()) {
                return Err(PipeflowError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!(
                        "Entry '{}' binds parameter '{}' more than once",
                        self.name, binding.name
                    ),
                ));
            }
        }

        if let Some(log) = &self.log {
            if log.base_name.trim().is_empty() {
                return Err(PipeflowError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("Entry '{}' enables a log file without a name", self.name),
                ));
            }
        }

        Ok(())
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config: Self = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        Ok(config)
    }

    pub fn render(&self, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            ConfigFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ConfigFormat::Toml => toml::to_string(self).map_err(|e| {
                PipeflowError::config_with_code(
                    ErrorCode::CONFIG_INVALID_TOML,
                    "Cannot render entry as TOML",
                )
                .with_source(e)
            }),
        }
    }

    /// Load and validate an entry file; the format follows the file extension
    pub async fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| common::unsupported_format(path))?;
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(common::config_not_found(path));
        }
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content, format).map_err(|e| e.with_path(path))?;
        config.validate().map_err(|e| e.with_path(path))?;
        Ok(config)
    }
}
