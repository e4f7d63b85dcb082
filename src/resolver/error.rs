use crate::error::{ErrorCode, PipeflowError};
use crate::model::ReferenceKind;

/// Failures reported by a definition store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Pipeline definition not found: {0}")]
    NotFound(String),

    #[error("Definition store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid pipeline definition {location}: {message}")]
    Invalid { location: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures resolving a reference into a loaded definition; always fatal
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("The {kind} reference is empty after variable substitution")]
    EmptyReference { kind: ReferenceKind },

    #[error("Unable to load pipeline {location}")]
    Store {
        location: String,
        #[source]
        source: StoreError,
    },
}

impl ResolutionError {
    pub fn code(&self) -> u16 {
        match self {
            ResolutionError::EmptyReference { .. } => ErrorCode::RESOLUTION_EMPTY_REFERENCE,
            ResolutionError::Store { source, .. } => match source {
                StoreError::NotFound(_) => ErrorCode::RESOLUTION_NOT_FOUND,
                StoreError::Unavailable(_) | StoreError::Io(_) => {
                    ErrorCode::RESOLUTION_STORE_UNAVAILABLE
                }
                StoreError::Invalid { .. } => ErrorCode::RESOLUTION_INVALID_DEFINITION,
            },
        }
    }
}

impl From<ResolutionError> for PipeflowError {
    fn from(err: ResolutionError) -> Self {
        let reference = match &err {
            ResolutionError::Store { location, .. } => Some(location.clone()),
            ResolutionError::EmptyReference { .. } => None,
        };
        PipeflowError::resolution(err.code(), err.to_string(), reference).with_source(err)
    }
}

impl From<StoreError> for PipeflowError {
    fn from(err: StoreError) -> Self {
        let code = match &err {
            StoreError::NotFound(_) => ErrorCode::RESOLUTION_NOT_FOUND,
            StoreError::Unavailable(_) | StoreError::Io(_) => ErrorCode::RESOLUTION_STORE_UNAVAILABLE,
            StoreError::Invalid { .. } => ErrorCode::RESOLUTION_INVALID_DEFINITION,
        };
        PipeflowError::resolution(code, err.to_string(), None).with_source(err)
    }
}
