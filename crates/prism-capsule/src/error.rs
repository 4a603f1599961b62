//! Capsule and runtime error types.

use prism_vfs::VfsError;
use thiserror::Error;

/// Errors that can occur while loading or running an application.
#[derive(Debug, Error)]
pub enum CapsuleError {
    /// No readable bundle at the requested path.
    #[error("No application at {0}")]
    NotFound(String),

    /// `manifest.json` is missing, unparseable, or lacks an id.
    #[error("Invalid manifest: {0}")]
    ManifestInvalid(String),

    /// The archive could not be decompressed or read.
    #[error("Bundle error: {0}")]
    Bundle(String),

    /// The archive contains a symlink, device node or similar.
    #[error("Unsafe entry type {entry_type} at {path}")]
    UnsafeEntryType {
        /// Tar entry type.
        entry_type: String,
        /// Entry path as stored in the archive.
        path: String,
    },

    /// An archive entry tries to escape the bundle root.
    #[error("Path traversal in bundle entry: {path}")]
    PathTraversal {
        /// Offending entry path.
        path: String,
    },

    /// Launch gave up after exhausting the fallback budget.
    #[error("Could not launch {path}: {reason}")]
    LaunchAborted {
        /// Bundle path of the final attempt.
        path: String,
        /// Why the final attempt failed.
        reason: String,
    },

    /// The execution engine failed.
    #[error("Engine error: {0}")]
    Engine(String),

    /// Neither the local cache nor the asset source has the module.
    #[error("Module unavailable: {0}")]
    ModuleUnavailable(String),

    /// Fetching from the asset source failed.
    #[error("Asset fetch failed for {path}: {message}")]
    Asset {
        /// Asset path relative to the source root.
        path: String,
        /// Transport error.
        message: String,
    },

    /// The runtime that owned this capability has shut down.
    #[error("Process runtime is no longer running")]
    RuntimeUnavailable,

    /// Filesystem failure.
    #[error(transparent)]
    Vfs(#[from] VfsError),

    /// Host I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for capsule operations.
pub type CapsuleResult<T> = Result<T, CapsuleError>;

/// Rejections of window-chrome requests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopbarError {
    /// The request is not a JSON object or a field has the wrong type.
    #[error("Malformed chrome request: {0}")]
    Malformed(String),

    /// A required field is absent or empty.
    #[error("Chrome item '{item}' is missing '{field}'")]
    MissingField {
        /// Item kind, e.g. `button`.
        item: String,
        /// Missing field name.
        field: &'static str,
    },

    /// The item `type` is not one the chrome understands.
    #[error("Unknown chrome item type: {0}")]
    UnknownItem(String),

    /// `add` for a name already present.
    #[error("Chrome element '{0}' already exists")]
    Duplicate(String),

    /// `update` for a name not present.
    #[error("No chrome element named '{0}'")]
    UnknownElement(String),
}
