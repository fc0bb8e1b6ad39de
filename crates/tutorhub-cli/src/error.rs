//! Error types for the tutorhub CLI

use std::path::PathBuf;
use thiserror::Error;

use tutorhub::http::ServeError;
use tutorhub::observability::ObservabilityError;
use tutorhub::AccessError;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file read error
    #[error("Failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Missing required configuration
    #[error("Missing required configuration: {field}")]
    MissingRequired { field: String },

    /// Invalid configuration or argument value
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Store, verifier or session failure
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Server failed to start or crashed
    #[error(transparent)]
    Serve(#[from] ServeError),

    /// Logging could not be initialized
    #[error(transparent)]
    Observability(#[from] ObservabilityError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a missing required field error
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Process exit code: 2 for rejected credentials or access, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Access(
                AccessError::InvalidCredentials
                | AccessError::LockedOut { .. }
                | AccessError::UnauthorizedSection { .. },
            ) => 2,
            _ => 1,
        }
    }

    /// Follow-up advice printed after the error, if any
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Access(AccessError::StoreLocked { .. }) => {
                Some("Stop `tutorhub serve` (or any other command using this store) and retry")
            }
            _ => None,
        }
    }
}
