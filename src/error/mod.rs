use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;
pub mod helpers;

pub use codes::{describe_error_code, ErrorCode};
pub use helpers::{common, ErrorExt};

/// The unified error type for pipeflow
///
/// Component errors (`ResolutionError`, `DispatchError`, `WorkerError`, ...) convert
/// into this type at module boundaries so callers outside the orchestrator see one
/// error surface with stable codes.
#[derive(Error, Debug)]
pub enum PipeflowError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Resolution error: {message}")]
    Resolution {
        code: u16,
        message: String,
        reference: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Binding error: {message}")]
    Binding {
        code: u16,
        message: String,
        parameter: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Dispatch error: {message}")]
    Dispatch {
        code: u16,
        message: String,
        strategy: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Remote worker error: {message}")]
    Remote {
        code: u16,
        message: String,
        worker: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Cluster error: {message}")]
    Cluster {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Log artifact error: {message}")]
    LogArtifact {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PipeflowError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a resolution error with specific code and the reference that failed
    pub fn resolution(code: u16, message: impl Into<String>, reference: Option<String>) -> Self {
        Self::Resolution {
            code,
            message: message.into(),
            reference,
            source: None,
        }
    }

    /// Create a binding error for a named parameter
    pub fn binding(code: u16, message: impl Into<String>, parameter: Option<String>) -> Self {
        Self::Binding {
            code,
            message: message.into(),
            parameter,
            source: None,
        }
    }

    /// Create a dispatch error with default code
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::dispatch_with_code(ErrorCode::DISPATCH_GENERIC, message, None)
    }

    /// Create a dispatch error with specific code and strategy name
    pub fn dispatch_with_code(
        code: u16,
        message: impl Into<String>,
        strategy: Option<String>,
    ) -> Self {
        Self::Dispatch {
            code,
            message: message.into(),
            strategy,
            source: None,
        }
    }

    /// Create a remote worker error
    pub fn remote(code: u16, message: impl Into<String>, worker: Option<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
            worker,
            source: None,
        }
    }

    /// Create a cluster error
    pub fn cluster(code: u16, message: impl Into<String>) -> Self {
        Self::Cluster {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a log artifact error
    pub fn log_artifact(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::LogArtifact {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the file path a configuration or log artifact error refers to
    pub fn with_path(mut self, new_path: impl Into<PathBuf>) -> Self {
        match &mut self {
            Self::Config { path, .. } | Self::LogArtifact { path, .. } => {
                *path = Some(new_path.into());
            }
            _ => {}
        }
        self
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Resolution { source: src, .. }
            | Self::Binding { source: src, .. }
            | Self::Dispatch { source: src, .. }
            | Self::Remote { source: src, .. }
            | Self::Cluster { source: src, .. }
            | Self::LogArtifact { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Resolution { message, .. }
            | Self::Binding { message, .. }
            | Self::Dispatch { message, .. }
            | Self::Remote { message, .. }
            | Self::Cluster { message, .. }
            | Self::LogArtifact { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Resolution { .. } => 3,
            Self::Binding { .. } => 4,
            Self::Dispatch { .. } => 5,
            Self::Remote { .. } => 6,
            Self::Cluster { .. } => 7,
            Self::LogArtifact { .. } => 8,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Resolution { code, .. }
            | Self::Binding { code, .. }
            | Self::Dispatch { code, .. }
            | Self::Remote { code, .. }
            | Self::Cluster { code, .. }
            | Self::LogArtifact { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, path, .. } => match path {
                Some(p) => format!("Configuration problem in {}: {}", p.display(), message),
                None => format!("Configuration problem: {}", message),
            },
            Self::Resolution {
                message, reference, ..
            } => match reference {
                Some(r) => format!("Cannot load pipeline '{}': {}", r, message),
                None => format!("Cannot load pipeline: {}", message),
            },
            Self::Binding {
                message, parameter, ..
            } => match parameter {
                Some(p) => format!("Parameter '{}': {}", p, message),
                None => format!("Parameter binding: {}", message),
            },
            Self::Dispatch {
                message, strategy, ..
            } => match strategy {
                Some(s) => format!("{} execution failed: {}", s, message),
                None => format!("Execution failed: {}", message),
            },
            Self::Remote {
                message, worker, ..
            } => match worker {
                Some(w) => format!("Worker '{}': {}", w, message),
                None => format!("Remote worker: {}", message),
            },
            Self::Cluster { message, .. } => format!("Clustered execution: {}", message),
            Self::LogArtifact { message, path, .. } => match path {
                Some(p) => format!("Log file {}: {}", p.display(), message),
                None => format!("Log file: {}", message),
            },
            Self::Other { message, .. } => message.clone(),
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        format!("{:#}", self)
    }
}

/// Type alias for Results using PipeflowError
pub type Result<T> = std::result::Result<T, PipeflowError>;

impl From<std::io::Error> for PipeflowError {
    fn from(err: std::io::Error) -> Self {
        PipeflowError::Other {
            code: ErrorCode::OTHER_IO,
            message: "I/O operation failed".to_string(),
            source: None,
        }
        .with_source(err)
    }
}

impl From<serde_yaml::Error> for PipeflowError {
    fn from(err: serde_yaml::Error) -> Self {
        PipeflowError::config_with_code(ErrorCode::CONFIG_INVALID_YAML, "Invalid YAML syntax")
            .with_source(err)
    }
}

impl From<serde_json::Error> for PipeflowError {
    fn from(err: serde_json::Error) -> Self {
        PipeflowError::config_with_code(ErrorCode::CONFIG_INVALID_JSON, "Invalid JSON syntax")
            .with_source(err)
    }
}

impl From<toml::de::Error> for PipeflowError {
    fn from(err: toml::de::Error) -> Self {
        PipeflowError::config_with_code(ErrorCode::CONFIG_INVALID_TOML, "Invalid TOML syntax")
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation_and_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.yml");
        let err = PipeflowError::resolution(
            ErrorCode::RESOLUTION_NOT_FOUND,
            "Definition file missing",
            Some("etl/load.yml".to_string()),
        )
        .with_source(io_err)
        .with_context("while resolving entry 'load'");

        assert_eq!(err.code(), ErrorCode::RESOLUTION_NOT_FOUND);
        assert!(err.to_string().contains("[E2001]"));
        assert!(err.user_message().contains("etl/load.yml"));
        assert!(err.user_message().contains("while resolving entry 'load'"));
    }

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(PipeflowError::config("bad").exit_code(), 2);
        assert_eq!(PipeflowError::dispatch("bad").exit_code(), 5);
        assert_eq!(PipeflowError::other("bad").exit_code(), 1);
    }

    #[test]
    fn test_with_path_only_touches_file_errors() {
        let err = PipeflowError::config("bad value").with_path("/tmp/entry.yml");
        assert!(err.user_message().contains("/tmp/entry.yml"));

        let err = PipeflowError::dispatch("boom").with_path("/tmp/ignored");
        assert!(!err.user_message().contains("/tmp/ignored"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: PipeflowError = std::io::Error::other("disk gone").into();
        assert_eq!(err.code(), ErrorCode::OTHER_IO);
    }
}
