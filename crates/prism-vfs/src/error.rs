//! Filesystem error types.

use prism_storage::StorageError;
use thiserror::Error;

/// Virtual filesystem errors.
///
/// Only real failures live here. A missing node and a node the caller may
/// not touch are deliberately indistinguishable and surface as an absent
/// result (`Ok(None)`) or a call with no effect, never as an error.
#[derive(Debug, Error)]
pub enum VfsError {
    /// The persistence layer failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored node could not be decoded.
    #[error("Corrupt node at {path}: {source}")]
    Corrupt {
        /// Path of the unreadable node.
        path: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The path is relative, escapes the root, or targets the root where a file is required.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience result type for VFS operations.
pub type VfsResult<T> = Result<T, VfsError>;
