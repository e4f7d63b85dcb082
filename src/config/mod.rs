//! Entry definitions and tool settings

pub mod entry;
pub mod settings;

pub use entry::{ConfigFormat, LogFileConfig, LogLevel, OrchestratorConfig, ParameterBinding};
pub use settings::{
    global_data_dir, CompatibilitySettings, PipeflowSettings, PollingSettings, SettingsLoader,
};
