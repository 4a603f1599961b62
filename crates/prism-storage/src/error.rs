//! Storage error types.

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// The backing medium could not be reached or opened.
    #[error("connection error: {0}")]
    Connection(String),

    /// Native IO error wrapper.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The key is invalid.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
