//! Error types for cotton-history

use thiserror::Error;

/// Errors raised by a history backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// Could not open or select the database
    #[error("history backend connection failed: {0}")]
    Connection(String),

    /// Query or write failed
    #[error("history backend error: {0}")]
    Backend(String),

    /// A stored row could not be converted back into a record
    #[error("stored record is invalid: {0}")]
    Serialization(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<cotton_core::ValidationError> for StorageError {
    fn from(err: cotton_core::ValidationError) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type for history operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;
