//! Unified error handling for the synchronization engine.
//!
//! Provides a unified `SyncError` type returned by every store operation that
//! can fail:
//!
//! - validation problems the caller can fix (`Validation`)
//! - backend failures (`Api`); optimistic local state is never rolled back
//! - authentication failures (`Unauthorized`); the session is torn down
//! - operator-only calls made without the operator role (`Forbidden`)
//!
//! Local storage failures are not part of this type: storage is a cache, so
//! those are logged and the operation continues with in-memory state.
//! Operating on a missing cart line or rating is a no-op, not an error.

use thiserror::Error;

use crate::api::ApiError;

/// Engine-level error type.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Backend call failed.
    #[error("Backend error: {0}")]
    Api(ApiError),

    /// The session token was rejected; the session has been torn down.
    #[error("Unauthorized: please sign in again")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The identity lacks the role an operation requires.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Input rejected before any state changed.
    #[error("Invalid input: {0}")]
    Validation(String),
}

impl From<ApiError> for SyncError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => Self::Unauthorized,
            ApiError::NotFound(what) => Self::NotFound(what),
            other => Self::Api(other),
        }
    }
}

impl SyncError {
    /// Whether this error requires the session to be torn down.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Result type alias for `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;
