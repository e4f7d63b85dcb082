//! Orchestration events, traced and mirrored into the optional log file

use super::log_artifact::LogArtifact;
use crate::config::LogLevel;
use crate::dispatch::LogForwarding;
use crate::model::RunOutcome;
use tracing::{debug, error, info, warn};

pub(crate) struct EventLog {
    entry: String,
    artifact: Option<LogArtifact>,
}

impl EventLog {
    pub(crate) fn new(entry: &str, artifact: Option<LogArtifact>) -> Self {
        Self {
            entry: entry.to_string(),
            artifact,
        }
    }

    pub(crate) fn debug(&mut self, message: &str) {
        debug!(entry = %self.entry, "{}", message);
        self.mirror(LogLevel::Debug, message);
    }

    pub(crate) fn info(&mut self, message: &str) {
        info!(entry = %self.entry, "{}", message);
        self.mirror(LogLevel::Info, message);
    }

    pub(crate) fn warn(&mut self, message: &str) {
        warn!(entry = %self.entry, "{}", message);
        self.mirror(LogLevel::Warn, message);
    }

    pub(crate) fn error(&mut self, message: &str) {
        error!(entry = %self.entry, "{}", message);
        self.mirror(LogLevel::Error, message);
    }

    /// Write to the log file only; for events already traced elsewhere
    pub(crate) fn mirror(&mut self, level: LogLevel, message: &str) {
        if let Some(artifact) = self.artifact.as_mut() {
            artifact.record(level, &self.entry, message);
        }
    }

    /// Log file settings handed to remote workers
    pub(crate) fn forwarding(&self) -> Option<LogForwarding> {
        self.artifact.as_ref().map(|artifact| LogForwarding {
            file: artifact.path().display().to_string(),
            append: artifact.append(),
            level: artifact.level(),
        })
    }

    pub(crate) fn finish(self, outcome: &mut RunOutcome, origin: &str) {
        if let Some(artifact) = self.artifact {
            artifact.finish(outcome, origin, &self.entry);
        }
    }
}
