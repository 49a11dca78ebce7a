//! Error taxonomy shared by the store, the access guard and the mutation API.

use thiserror::Error;

use crate::document::PrincipalId;

/// Failures surfaced by every store operation.
///
/// Presentation layers map each kind to a short user-facing message and must
/// never forward the payload of [`StoreError::Storage`] verbatim.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The document failed the shape check; nothing was written.
    #[error("invalid document: {0}")]
    Validation(String),

    /// The principal is not in a non-empty admin list.
    #[error("principal {0} is not an admin of this trip")]
    Authorization(PrincipalId),

    /// A referenced day, checklist category or collection index is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend failed to read or write, or the stored bytes are corrupt.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn validation(reason: impl Into<String>) -> Self {
        StoreError::Validation(reason.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        StoreError::Storage(reason.into())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
