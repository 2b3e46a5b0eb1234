//! Errors raised by [`crate::DocumentStore`] and [`crate::BlobStore`] backends.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// A batch precondition did not hold. The whole batch was rejected.
    #[error("write conflict on {collection}/{id}: expected {expected}, found {found}")]
    Conflict {
        collection: String,
        id: String,
        expected: String,
        found: String,
    },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
