//! Prism VFS: the hierarchical, permission-gated filesystem of the desktop.
//!
//! Nodes are addressed by absolute, slash-delimited paths and persisted one
//! per key in a [`prism_storage::KvStore`]. Directories list their children,
//! files carry a payload whose mimetype is sniffed from its bytes.
//!
//! Invariants the [`Vfs`] maintains:
//!
//! - Every node except `/` is listed exactly once in its parent's content.
//! - Deleting a directory deletes its whole subtree first.
//! - Every file has an entry in the [`FileIndex`]; deleted files do not.
//! - A caller never learns whether a path it may not access exists.
//!
//! Read-modify-write cycles on one node are serialized through an internal
//! per-path lock table, always acquired descendant before ancestor.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Error types.
pub mod error;
/// Flat file index and its autosave task.
pub mod index;
mod locks;
/// Content-based mimetype sniffing.
pub mod mime;
/// Persisted node records.
pub mod node;
/// Path normalization helpers.
pub mod path;
/// Permission tags.
pub mod permissions;
/// The filesystem itself.
pub mod vfs;

pub use error::{VfsError, VfsResult};
pub use index::{FileIndex, INDEX_PATH, IndexEntry, spawn_autosave};
pub use node::{Content, Meta, Node, NodeBody};
pub use permissions::PermissionSet;
pub use vfs::Vfs;
