//! Execution engine seam.
//!
//! An engine owns one isolated execution context: it loads the composed
//! [`AppDocument`], cuts the context's references back to its host, and
//! exposes the [`CapabilityBridge`] as the context's only way out. A browser
//! host backs this with a sandboxed frame; [`HeadlessEngine`] records what it
//! is given and runs nothing.

mod headless;

pub use headless::{
    DEFAULT_RETAINED_UNLOADED, HeadlessEngine, HeadlessEngineFactory, HeadlessSnapshot,
};

use std::sync::Arc;

use async_trait::async_trait;

use crate::bridge::CapabilityBridge;
use crate::error::CapsuleResult;
use crate::loader::AppDocument;
use crate::process::ProcessId;

/// Host references an application context must not be able to reach.
pub const HOST_REFERENCES: [&str; 3] = ["parent", "opener", "frameElement"];

/// A runtime environment for one application instance.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Load the document and wait for its initial load to finish.
    async fn load(&mut self, document: &AppDocument) -> CapsuleResult<()>;

    /// Make `reference` (one of [`HOST_REFERENCES`]) unreachable from inside
    /// the context.
    fn sever(&mut self, reference: &str) -> CapsuleResult<()>;

    /// Expose the bridge in the context's global scope.
    fn bind(&mut self, bridge: Arc<CapabilityBridge>) -> CapsuleResult<()>;

    /// Tear the context down. In-flight bridge calls are not awaited.
    async fn unload(&mut self) -> CapsuleResult<()>;
}

/// Creates one engine per launch.
pub trait EngineFactory: Send + Sync {
    /// A fresh, unloaded engine for process `id`.
    fn create(&self, id: ProcessId) -> Box<dyn ExecutionEngine>;
}
