//! Prism Capsule: application bundles and the sandboxed process runtime.
//!
//! An installed application is a compressed bundle stored in the VFS. The
//! [`ProcessRuntime`] unpacks it, validates its [`Manifest`], loads the
//! composed document into an isolated [`ExecutionEngine`] context and binds
//! a per-process [`CapabilityBridge`], the only way application code can
//! reach the filesystem, other processes, system modules or its window
//! chrome. Every bridge capability is a thin wrapper over VFS operations
//! with the caller permission fixed to `user`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Sources for stylesheets, bundles and system modules.
pub mod assets;
/// Capabilities exposed to running applications.
pub mod bridge;
/// Bundle archive codec.
pub mod bundle;
/// Execution engine seam.
pub mod engine;
/// Error types.
pub mod error;
/// Document composition.
pub mod loader;
/// `manifest.json` parsing.
pub mod manifest;
/// Process identity and lifecycle events.
pub mod process;
mod registry;
/// The process runtime.
pub mod runtime;

pub use assets::{AssetSource, DirAssetSource, HttpAssetSource, MemoryAssetSource, NoAssets};
pub use bridge::CapabilityBridge;
pub use bundle::{AppBundle, BundleFiles, pack_bundle, unpack_bundle};
pub use engine::{EngineFactory, ExecutionEngine, HeadlessEngineFactory};
pub use error::{CapsuleError, CapsuleResult, TopbarError};
pub use loader::AppDocument;
pub use manifest::Manifest;
pub use process::{ProcessEvent, ProcessId, ProcessInfo, ProcessState};
pub use runtime::{ProcessRuntime, RuntimeConfig};
