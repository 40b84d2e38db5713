//! Error types for form extraction and document regeneration.
//!
//! Every stage of the regeneration pipeline maps its failure into one of these
//! variants. None of them are retried; the caller decides what to show the user.

use std::path::PathBuf;

/// Result type alias for form filling operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, filling or managing documents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Source document does not exist or cannot be opened
    #[error("Document not found or unreadable: {}", path.display())]
    NotFound {
        /// Path that was requested
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Document contains no form
    #[error("Document doesn't contain a form")]
    NoForm,

    /// Document has zero pages
    #[error("Document has no pages")]
    EmptyDocument,

    /// Export or fill produced nothing to write
    #[error("No form fields affected")]
    NoFieldsAffected,

    /// Parse or validation failure
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Page tree or widget appearance rebuild failed
    #[error("Failed to rebuild page tree: {0}")]
    RebuildFailed(String),

    /// Preview or fill requested with nothing selected
    #[error("No file selected")]
    NoFileSelected,

    /// New artifact was committed but the previous one could not be deleted
    #[error("Failed to remove previous generated document {}: {source}", path.display())]
    ArtifactCleanupFailed {
        /// Artifact that is still on disk
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Another operation currently holds the session
    #[error("Session is busy with another regeneration")]
    Busy,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::InvalidDocument(err.to_string())
    }
}
