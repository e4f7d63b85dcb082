//! Per-invocation log file
//!
//! The orchestrator mirrors its own events into this file while it runs and
//! registers the file as a `Log` result file once the invocation is over.

use crate::config::{LogFileConfig, LogLevel};
use crate::error::{ErrorCode, PipeflowError};
use crate::model::{ResultFile, ResultFileKind, RunOutcome, VariableScope};
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum LogArtifactError {
    #[error("Log file name is empty")]
    MissingName,

    #[error("Parent folder of log file {} does not exist", .0.display())]
    ParentMissing(PathBuf),

    #[error("Unable to open log file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<LogArtifactError> for PipeflowError {
    fn from(err: LogArtifactError) -> Self {
        let (code, path) = match &err {
            LogArtifactError::MissingName => (ErrorCode::LOG_MISSING_NAME, None),
            LogArtifactError::ParentMissing(path) => {
                (ErrorCode::LOG_PARENT_MISSING, Some(path.clone()))
            }
            LogArtifactError::Open { path, .. } => (ErrorCode::LOG_OPEN_FAILED, Some(path.clone())),
        };
        PipeflowError::log_artifact(code, err.to_string(), path).with_source(err)
    }
}

/// Build the log file name: substituted base name, then `_yyyyMMdd`, then
/// `_HHmmss`, then the extension.
pub fn file_name(
    config: &LogFileConfig,
    scope: &VariableScope,
    now: DateTime<Local>,
) -> Result<String, LogArtifactError> {
    let base = scope.substitute(&config.base_name);
    let base = base.trim();
    if base.is_empty() {
        return Err(LogArtifactError::MissingName);
    }

    let mut name = base.to_string();
    if config.add_date {
        name.push_str(&now.format("_%Y%m%d").to_string());
    }
    if config.add_time {
        name.push_str(&now.format("_%H%M%S").to_string());
    }
    let extension = scope.substitute(&config.extension);
    if !extension.trim().is_empty() {
        name.push('.');
        name.push_str(extension.trim());
    }
    Ok(name)
}

pub struct LogArtifact {
    path: PathBuf,
    level: LogLevel,
    append: bool,
    writer: LineWriter<File>,
    write_failed: bool,
}

impl LogArtifact {
    pub fn open(
        config: &LogFileConfig,
        scope: &VariableScope,
        now: DateTime<Local>,
    ) -> Result<Self, LogArtifactError> {
        let path = PathBuf::from(file_name(config, scope, now)?);
        ensure_parent(&path, config.create_parent_folder)?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&path)
            .map_err(|source| LogArtifactError::Open {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "Opened log file");

        Ok(Self {
            path,
            level: config.level,
            append: config.append,
            writer: LineWriter::new(file),
            write_failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn append(&self) -> bool {
        self.append
    }

    /// Write one event line if `level` passes the file's threshold.
    /// Failures are remembered and reported by [`LogArtifact::finish`].
    pub fn record(&mut self, level: LogLevel, entry: &str, message: &str) {
        if !self.level.admits(level) || self.write_failed {
            return;
        }
        let line = format!(
            "{} - {} - {} - {}",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            entry,
            level.as_str(),
            message
        );
        if let Err(e) = writeln!(self.writer, "{}", line) {
            warn!(path = %self.path.display(), "Unable to write log file: {}", e);
            self.write_failed = true;
        }
    }

    /// Close the file and register it on `outcome`
    pub fn finish(mut self, outcome: &mut RunOutcome, origin: &str, producer: &str) {
        if let Err(e) = self.writer.flush() {
            warn!(path = %self.path.display(), "Unable to flush log file: {}", e);
            self.write_failed = true;
        }
        if self.write_failed && outcome.error_count == 0 {
            outcome.error_count = 1;
        }
        outcome.add_file(
            ResultFile::new(ResultFileKind::Log, self.path.display().to_string())
                .with_origin(origin, producer),
        );
    }
}

fn ensure_parent(path: &Path, create: bool) -> Result<(), LogArtifactError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.exists() {
        return Ok(());
    }
    if !create {
        return Err(LogArtifactError::ParentMissing(parent.to_path_buf()));
    }
    std::fs::create_dir_all(parent).map_err(|source| LogArtifactError::Open {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_file_name_with_date_and_time() {
        let mut config = LogFileConfig::new("${LOG_DIR}/load");
        config.add_date = true;
        config.add_time = true;
        let scope: VariableScope = [("LOG_DIR", "/var/log")].into_iter().collect();

        let name = file_name(&config, &scope, noon()).unwrap();
        assert_eq!(name, "/var/log/load_20240309_140507.log");
    }

    #[test]
    fn test_file_name_without_extension() {
        let mut config = LogFileConfig::new("load");
        config.extension = String::new();
        assert_eq!(file_name(&config, &VariableScope::new(), noon()).unwrap(), "load");
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let config = LogFileConfig::new("${UNSET}");
        let scope: VariableScope = [("UNSET", "  ")].into_iter().collect();
        assert!(matches!(
            file_name(&config, &scope, noon()),
            Err(LogArtifactError::MissingName)
        ));
    }

    #[test]
    fn test_missing_parent_without_create() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("missing").join("load");
        let config = LogFileConfig::new(base.display().to_string());

        let err = LogArtifact::open(&config, &VariableScope::new(), noon()).err();
        assert!(matches!(err, Some(LogArtifactError::ParentMissing(_))));
    }

    #[test]
    fn test_records_respect_level_and_register_file() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("logs").join("load");
        let mut config = LogFileConfig::new(base.display().to_string());
        config.create_parent_folder = true;
        config.level = LogLevel::Warn;

        let mut artifact = LogArtifact::open(&config, &VariableScope::new(), noon()).unwrap();
        let path = artifact.path().to_path_buf();
        artifact.record(LogLevel::Info, "entry", "not written");
        artifact.record(LogLevel::Error, "entry", "written");

        let mut outcome = RunOutcome::new();
        artifact.finish(&mut outcome, "parent", "entry");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("ERROR - written"));
        assert!(!content.contains("not written"));
        assert!(outcome.succeeded());

        let file = &outcome.files[&path.display().to_string()];
        assert_eq!(file.kind, ResultFileKind::Log);
        assert_eq!(file.origin.as_deref(), Some("parent"));
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("load");
        let path = temp.path().join("load.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let mut config = LogFileConfig::new(base.display().to_string());
        config.append = true;
        let mut artifact = LogArtifact::open(&config, &VariableScope::new(), noon()).unwrap();
        artifact.record(LogLevel::Info, "entry", "later");
        artifact.finish(&mut RunOutcome::new(), "parent", "entry");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier\n"));
        assert!(content.contains("later"));
    }
}
