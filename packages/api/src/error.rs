//! # Error taxonomy for club operations
//!
//! Every operation in this crate returns [`ApiResult`]. Store failures are
//! classified on the way in:
//!
//! | [`StoreError`] | [`ApiError`] |
//! |----------------|--------------|
//! | `NotFound` | `NotFound` |
//! | `Conflict` | `Conflict` |
//! | `Io`, `Unavailable` | `Network` (transient) |
//! | `Serde`, `Config` | `Internal` |
//!
//! Only [`ApiError::Network`] is transient; front ends may offer a retry for it
//! and should show every other kind as-is.

use store::StoreError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Input rejected before touching the store.
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The target changed underneath the request, or already is in the
    /// requested state.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("storage unreachable: {0}")]
    Network(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => ApiError::NotFound {
                kind: "document",
                id: format!("{collection}/{id}"),
            },
            e @ StoreError::Conflict { .. } => ApiError::Conflict(e.to_string()),
            StoreError::Io(e) => ApiError::Network(e.to_string()),
            StoreError::Unavailable(msg) => ApiError::Network(msg),
            e @ (StoreError::Serde(_) | StoreError::Config(_)) => ApiError::Internal(e.to_string()),
        }
    }
}
