//! Run outcomes returned to the parent workflow

use super::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What kind of artifact a result file is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResultFileKind {
    #[default]
    General,
    Log,
    Error,
    Warning,
}

/// Reference to a file produced while running a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFile {
    pub kind: ResultFileKind,
    /// Location of the file; also its identifier in [`RunOutcome::files`]
    pub path: String,
    /// Name of the workflow the file was produced in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Name of the step that produced the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
}

impl ResultFile {
    pub fn new(kind: ResultFileKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            origin: None,
            producer: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>, producer: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self.producer = Some(producer.into());
        self
    }
}

/// The aggregate result of one or more pipeline invocations.
///
/// Success is derived from the error count on every read, so it can never disagree
/// with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    #[serde(default)]
    pub error_count: u64,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub files: BTreeMap<String, ResultFile>,
    /// The run was stopped before it finished on its own
    #[serde(default)]
    pub stopped: bool,
    /// Index of the parent workflow entry that produced this outcome
    #[serde(default)]
    pub entry_nr: u32,
    /// Worker log text, only filled by remote status calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_text: Option<String>,
}

impl RunOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome carrying only an error count
    pub fn failed(error_count: u64) -> Self {
        Self {
            error_count,
            ..Self::default()
        }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn succeeded(&self) -> bool {
        self.error_count == 0
    }

    pub fn add_errors(&mut self, count: u64) {
        self.error_count = self.error_count.saturating_add(count);
    }

    /// Prepare a carried-over outcome for the next parent entry.
    ///
    /// Rows, files and the error count are kept; the stop flag and worker log
    /// text belong to the previous entry and are dropped.
    pub fn begin_entry(&mut self, entry_nr: u32) {
        self.stopped = false;
        self.log_text = None;
        self.entry_nr = entry_nr;
    }

    pub fn add_file(&mut self, file: ResultFile) {
        self.files.insert(file.path.clone(), file);
    }

    /// Flatten into a serializable summary that includes the derived success flag
    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary {
            succeeded: self.succeeded(),
            error_count: self.error_count,
            row_count: self.rows.len(),
            files: self.files.keys().cloned().collect(),
            stopped: self.stopped,
        }
    }
}

/// Compact, user-facing view of a [`RunOutcome`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub succeeded: bool,
    pub error_count: u64,
    pub row_count: usize,
    pub files: Vec<String>,
    pub stopped: bool,
}
