//! Layered tool settings: built-in defaults, then the global settings file, then
//! the project settings file, then `PIPEFLOW_*` environment variables.

use crate::error::{ErrorCode, ErrorExt, PipeflowError, Result};
use crate::model::WorkerRegistry;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Directory (relative to a project root) holding project settings
pub const PROJECT_SETTINGS_DIR: &str = ".pipeflow";
pub const SETTINGS_FILE: &str = "config.toml";

/// Get the global pipeflow directory for storing settings and data
pub fn global_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "pipeflow", "pipeflow")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| PipeflowError::config("Could not determine home directory"))
}

/// Poll intervals for the three dispatch strategies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    #[serde(with = "humantime_serde")]
    pub local: Duration,
    #[serde(with = "humantime_serde")]
    pub remote: Duration,
    #[serde(with = "humantime_serde")]
    pub cluster: Duration,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            local: Duration::from_millis(20),
            remote: Duration::from_secs(2),
            cluster: Duration::from_secs(2),
        }
    }
}

/// Switches that restore older behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatibilitySettings {
    /// Run once, with no row bound, when per-row mode receives no rows
    pub run_once_on_empty_input: bool,
    /// Warn whenever per-row mode receives no rows
    pub warn_on_empty_input: bool,
}

impl Default for CompatibilitySettings {
    fn default() -> Self {
        Self {
            run_once_on_empty_input: false,
            warn_on_empty_input: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeflowSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Root directory of the file definition store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions_root: Option<PathBuf>,
    pub polling: PollingSettings,
    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,
    pub compatibility: CompatibilitySettings,
    pub workers: WorkerRegistry,
    /// Named run configurations: `local`, `remote:<worker>`, `clustered` or `disabled`
    pub run_configurations: BTreeMap<String, String>,
}

impl Default for PipeflowSettings {
    fn default() -> Self {
        Self {
            log_level: None,
            definitions_root: None,
            polling: PollingSettings::default(),
            http_timeout: Duration::from_secs(30),
            compatibility: CompatibilitySettings::default(),
            workers: WorkerRegistry::new(),
            run_configurations: BTreeMap::new(),
        }
    }
}

impl PipeflowSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env(|key| std::env::var(key).ok());
    }

    /// Apply `PIPEFLOW_*` overrides read through `lookup`
    pub fn merge_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("PIPEFLOW_LOG_LEVEL") {
            self.log_level = Some(level);
        }

        if let Some(root) = lookup("PIPEFLOW_DEFINITIONS") {
            self.definitions_root = Some(PathBuf::from(root));
        }

        if let Some(ms) = lookup("PIPEFLOW_REMOTE_POLL_MS").and_then(|v| v.parse().ok()) {
            self.polling.remote = Duration::from_millis(ms);
        }

        if let Some(ms) = lookup("PIPEFLOW_CLUSTER_POLL_MS").and_then(|v| v.parse().ok()) {
            self.polling.cluster = Duration::from_millis(ms);
        }

        if let Some(secs) = lookup("PIPEFLOW_HTTP_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.http_timeout = Duration::from_secs(secs);
        }

        if let Some(value) = lookup("PIPEFLOW_RUN_ONCE_ON_EMPTY_INPUT") {
            if let Ok(enabled) = value.parse::<bool>() {
                self.compatibility.run_once_on_empty_input = enabled;
            }
        }
    }

    pub fn definitions_root(&self) -> PathBuf {
        self.definitions_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Loads [`PipeflowSettings`] from the settings layers
#[derive(Debug, Clone, Default)]
pub struct SettingsLoader {
    global_path: Option<PathBuf>,
    project_root: Option<PathBuf>,
    skip_env: bool,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            global_path: global_data_dir().ok().map(|dir| dir.join(SETTINGS_FILE)),
            project_root: std::env::current_dir().ok(),
            skip_env: false,
        }
    }

    pub fn with_global_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_path = Some(path.into());
        self
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub async fn load(&self) -> Result<PipeflowSettings> {
        let mut merged = toml::Table::new();

        if let Some(global) = &self.global_path {
            if let Some(table) = read_layer(global).await? {
                debug!("Loaded global settings from {}", global.display());
                merge_tables(&mut merged, table);
            }
        }

        if let Some(root) = &self.project_root {
            let project = root.join(PROJECT_SETTINGS_DIR).join(SETTINGS_FILE);
            if let Some(table) = read_layer(&project).await? {
                debug!("Loaded project settings from {}", project.display());
                merge_tables(&mut merged, table);
            }
        }

        let rendered = toml::to_string(&merged).map_err(|e| {
            PipeflowError::config_with_code(ErrorCode::CONFIG_INVALID_TOML, "Cannot merge settings")
                .with_source(e)
        })?;
        let mut settings: PipeflowSettings = toml::from_str(&rendered)?;

        if !self.skip_env {
            settings.merge_env_vars();
        }

        Ok(settings)
    }
}

async fn read_layer(path: &Path) -> Result<Option<toml::Table>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .to_config_error(format!("Cannot read settings file {}", path.display()))?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| {
        PipeflowError::from(e).with_path(path)
    })?;
    Ok(Some(table))
}

/// Recursively overlay `overlay` onto `base`; nested tables merge, other values replace
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = PipeflowSettings::default();
        assert_eq!(settings.polling.local, Duration::from_millis(20));
        assert_eq!(settings.polling.remote, Duration::from_secs(2));
        assert!(!settings.compatibility.run_once_on_empty_input);
        assert!(settings.compatibility.warn_on_empty_input);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = PipeflowSettings::default();
        settings.merge_env(|key| match key {
            "PIPEFLOW_REMOTE_POLL_MS" => Some("250".to_string()),
            "PIPEFLOW_RUN_ONCE_ON_EMPTY_INPUT" => Some("true".to_string()),
            "PIPEFLOW_DEFINITIONS" => Some("/srv/pipelines".to_string()),
            _ => None,
        });

        assert_eq!(settings.polling.remote, Duration::from_millis(250));
        assert!(settings.compatibility.run_once_on_empty_input);
        assert_eq!(settings.definitions_root(), PathBuf::from("/srv/pipelines"));
    }

    #[test]
    fn test_env_ignores_unparseable_values() {
        let mut settings = PipeflowSettings::default();
        settings.merge_env(|key| match key {
            "PIPEFLOW_REMOTE_POLL_MS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(settings.polling.remote, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_project_layer_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        std::fs::write(
            &global,
            r#"
http_timeout = "10s"

[polling]
remote = "5s"
cluster = "7s"

[workers.etl-1]
name = "etl-1"
url = "http://etl-1:8181"

[run_configurations]
nightly = "clustered"
"#,
        )
        .unwrap();

        let project = dir.path().join("project");
        std::fs::create_dir_all(project.join(PROJECT_SETTINGS_DIR)).unwrap();
        std::fs::write(
            project.join(PROJECT_SETTINGS_DIR).join(SETTINGS_FILE),
            r#"
[polling]
remote = "500ms"

[compatibility]
run_once_on_empty_input = true
"#,
        )
        .unwrap();

        let settings = SettingsLoader::default()
            .with_global_path(&global)
            .with_project_root(&project)
            .without_env()
            .load()
            .await
            .unwrap();

        assert_eq!(settings.polling.remote, Duration::from_millis(500));
        assert_eq!(settings.polling.cluster, Duration::from_secs(7));
        assert_eq!(settings.polling.local, Duration::from_millis(20));
        assert_eq!(settings.http_timeout, Duration::from_secs(10));
        assert!(settings.compatibility.run_once_on_empty_input);
        assert!(settings.compatibility.warn_on_empty_input);
        assert!(settings.workers.find("etl-1").is_some());
        assert_eq!(settings.run_configurations["nightly"], "clustered");
    }

    #[tokio::test]
    async fn test_missing_layers_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = SettingsLoader::default()
            .with_global_path(dir.path().join("absent.toml"))
            .with_project_root(dir.path())
            .without_env()
            .load()
            .await
            .unwrap();
        assert_eq!(settings, PipeflowSettings::default());
    }

    #[tokio::test]
    async fn test_invalid_layer_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        std::fs::write(&global, "polling = [").unwrap();

        let err = SettingsLoader::default()
            .with_global_path(&global)
            .without_env()
            .load()
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CONFIG_INVALID_TOML);
    }
}
