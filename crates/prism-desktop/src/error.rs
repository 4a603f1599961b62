use prism_capsule::CapsuleError;
use prism_storage::StorageError;
use prism_vfs::VfsError;
use thiserror::Error;

/// Errors raised while opening, booting or driving the desktop.
#[derive(Debug, Error)]
pub enum BootError {
    /// The persistence backend could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Filesystem failure.
    #[error(transparent)]
    Vfs(#[from] VfsError),

    /// Bundle, asset or runtime failure.
    #[error(transparent)]
    Capsule(#[from] CapsuleError),

    /// A required system asset is neither stored nor fetchable.
    #[error("Required asset {path} is unavailable")]
    MissingAsset {
        /// Asset path relative to the source root.
        path: String,
    },

    /// A default application list that is not a JSON array of names.
    #[error("Invalid application list: {0}")]
    InvalidAppList(String),

    /// The desktop crashed during boot and refuses further work.
    #[error("System Crash: {0}")]
    Crashed(String),
}

/// Result type for desktop operations.
pub type BootResult<T> = Result<T, BootError>;
