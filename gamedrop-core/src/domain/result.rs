//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Variants follow the failure taxonomy of the service boundary: every
/// variant maps onto exactly one HTTP status in the server crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Invalid catalog entry: {0}")]
    InvalidCatalogEntry(String),

    #[error("Failed to download {url}: {reason}")]
    SegmentFetchFailed { url: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a segment fetch failure for the given URL
    pub fn segment_failed(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::SegmentFetchFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures caused by a remote dependency rather than the caller
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::CatalogUnavailable(_) | Self::InvalidCatalogEntry(_) | Self::SegmentFetchFailed { .. }
        )
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
