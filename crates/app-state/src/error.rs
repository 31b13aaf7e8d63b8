//! Errors for explicit user actions on the session store.

use narrator_common::PresentationId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Please enter a name for the presentation")]
    EmptyName,

    #[error("No presentation is loaded")]
    NothingLoaded,

    #[error("Presentation not found: {0}")]
    NotFound(PresentationId),
}

pub type StoreResult<T> = Result<T, StoreError>;
