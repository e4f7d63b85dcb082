use super::{ErrorCode, PipeflowError};
use std::path::Path;

/// Extension trait for convenient error conversion
pub trait ErrorExt<T> {
    /// Convert to PipeflowError with context
    fn to_pipeflow(self, context: impl Into<String>) -> Result<T, PipeflowError>;

    /// Convert to a configuration error
    fn to_config_error(self, message: impl Into<String>) -> Result<T, PipeflowError>;

    /// Convert to a dispatch error
    fn to_dispatch_error(self, message: impl Into<String>) -> Result<T, PipeflowError>;
}

impl<T, E> ErrorExt<T> for Result<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn to_pipeflow(self, context: impl Into<String>) -> Result<T, PipeflowError> {
        self.map_err(|e| PipeflowError::other(context).with_source(e))
    }

    fn to_config_error(self, message: impl Into<String>) -> Result<T, PipeflowError> {
        self.map_err(|e| PipeflowError::config(message).with_source(e))
    }

    fn to_dispatch_error(self, message: impl Into<String>) -> Result<T, PipeflowError> {
        self.map_err(|e| PipeflowError::dispatch(message).with_source(e))
    }
}

/// Helper functions for common error scenarios
pub mod common {
    use super::*;

    /// Configuration file does not exist
    pub fn config_not_found(path: impl AsRef<Path>) -> PipeflowError {
        PipeflowError::config_with_code(
            ErrorCode::CONFIG_NOT_FOUND,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_path(path.as_ref())
    }

    /// Configuration file extension is not one of yml/yaml/json/toml
    pub fn unsupported_format(path: impl AsRef<Path>) -> PipeflowError {
        PipeflowError::config_with_code(
            ErrorCode::CONFIG_UNSUPPORTED_FORMAT,
            format!(
                "Unsupported file format (expected .yml, .yaml, .json or .toml): {}",
                path.as_ref().display()
            ),
        )
        .with_path(path.as_ref())
    }
}
