//! Session-level errors (thiserror-based).

use std::time::Duration;

use narrator_app_state::StoreError;
use narrator_audio::AudioError;
use narrator_project::{PersistenceError, ValidationError};
use thiserror::Error;

/// Failure of an external generation service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Service returned an invalid response: {0}")]
    InvalidResponse(String),
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Top-level error for session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Please enter some text first")]
    EmptyContent,

    #[error("Please enter at least {min} characters (got {actual})")]
    ContentTooShort { min: usize, actual: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    /// The import-validation reason, whether raised directly or while reading a file.
    pub fn validation(&self) -> Option<ValidationError> {
        match self {
            SessionError::Validation(v) => Some(*v),
            SessionError::Persistence(PersistenceError::Validation(v)) => Some(*v),
            _ => None,
        }
    }
}
