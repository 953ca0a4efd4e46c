//! Common error types and handling for Dashvault

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Dashvault workspace
///
/// Every variant carries a human-readable cause naming the alias, path or
/// artifact type involved.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Unsupported panel type: {0}")]
    UnsupportedPanelType(String),

    #[error("Empty artifact: {0}")]
    EmptyArtifact(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Get the error code used when reporting per-item failures
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Duplicate(_) => "DUPLICATE",
            Error::Conflict(_) => "CONFLICT",
            Error::UnknownType(_) => "UNKNOWN_TYPE",
            Error::UnsupportedPanelType(_) => "UNSUPPORTED_PANEL_TYPE",
            Error::EmptyArtifact(_) => "EMPTY_ARTIFACT",
            Error::Import(_) => "IMPORT_ERROR",
            Error::Export(_) => "EXPORT_ERROR",
            Error::Store(_) => "STORE_ERROR",
        }
    }

    /// Whether a batch caller may log this failure and move on to the next item
    pub fn is_skippable(&self) -> bool {
        matches!(self, Error::EmptyArtifact(_))
    }
}
