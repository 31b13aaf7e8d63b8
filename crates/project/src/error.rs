//! Error types for the persistence crate (thiserror-based).

use thiserror::Error;

/// Why an import file was rejected. Every variant is shown to the user.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("This file appears to be corrupted")]
    Corrupted,

    #[error("This file was created with an incompatible version")]
    IncompatibleVersion,

    #[error("This file is missing required data")]
    MissingData,

    #[error("File is too large (max 10MB)")]
    TooLarge,

    #[error("Please select a .narrator or .json file")]
    UnsupportedFile,
}

/// Errors from the durable store and file I/O.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// File I/O error (read, write, rename, directory listing).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored record could not be interpreted.
    #[error("Invalid record {key}: {reason}")]
    InvalidRecord { key: String, reason: String },

    /// The backing store refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Import rejected: {0}")]
    Validation(#[from] ValidationError),
}

/// Convenience Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
