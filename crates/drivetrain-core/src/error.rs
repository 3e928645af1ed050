//! Error types for drivetrain-core

use thiserror::Error;

/// Result type alias using drivetrain-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in drivetrain-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream provider returned an error response
    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// Upstream credentials could not be obtained
    #[error("Auth error: {0}")]
    Auth(String),

    /// Artifact reached a terminal failed status
    #[error("Artifact {0} failed to process")]
    ArtifactFailed(String),

    /// A bounded wait expired
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Record or remote object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn upstream(service: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            service,
            message: message.into(),
        }
    }

    /// Whether the error means the record store itself is unreachable.
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Sqlite(_))
    }
}
