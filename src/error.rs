//! Error types for the Pangolin restart service

use std::path::PathBuf;
use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Service error types
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Invalid port range, missing Pangolin directory, or similar startup fault
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// Errors raised while editing one of the Pangolin YAML files
#[derive(Error, Debug)]
pub enum EditError {
    /// An expected section of the document is absent
    #[error("{0} not found")]
    NotFound(String),

    /// The file could not be read or written
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML, or could not be re-serialized
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl EditError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}
