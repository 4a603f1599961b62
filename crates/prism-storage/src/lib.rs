//! Prism Storage: the raw persistence layer beneath the virtual filesystem.
//!
//! The VFS never touches a disk or a database directly. It talks to a
//! [`KvStore`], an opaque asynchronous `get`/`set`/`delete`/`list_keys`
//! store addressed by string keys (in practice, absolute VFS paths).
//! There are no multi-key transactions: every call stands alone.
//!
//! Implementations:
//!
//! - [`MemoryKvStore`]: ordered in-memory map for tests and ephemeral sessions
//! - [`DirKvStore`]: one file per key under a root directory

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod dir;
pub mod error;
pub mod kv;

pub use dir::DirKvStore;
pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore};
