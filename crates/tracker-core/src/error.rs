//! Error types for tracker and backend operations.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors reported by a storage or blob backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Identity never resolved: no principal, explicit sign-out, or timeout.
    #[error("not authenticated")]
    Unauthenticated,

    /// Record not found under the current principal's scope.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Malformed caller input.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Underlying store or network failure.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Blob write failure. Distinct from metadata write failure so callers
    /// can retry the upload precisely.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// A stored record could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<StoreError> for TrackerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => TrackerError::StorageUnavailable(msg),
        }
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
