//! The capability bridge: the only API an application context can call.
//!
//! A [`CapabilityBridge`] is built once per process, with the process id,
//! the manifest identity and the caller permission set fixed at construction.
//! Nothing on it can be re-pointed afterwards; applications cannot ask for
//! other tags or another identity.

mod fs;
mod module;
mod process;
mod storage;
mod topbar;

pub use fs::FileCapability;
pub use module::{MODULE_DIR, ModuleHandle, ModuleLoader};
pub use process::{ProcessCapability, ProcessControl};
pub use storage::{APP_STORAGE_ROOT, AppStorage};
pub use topbar::{ChromeElement, ChromeItem, ChromePosition, Topbar};

use std::sync::{Arc, Weak};

use prism_vfs::{PermissionSet, Vfs};

use crate::assets::AssetSource;
use crate::process::ProcessId;

/// Inputs for building a bridge.
pub struct BridgeContext {
    /// Owning process.
    pub process_id: ProcessId,
    /// Manifest identity of the application.
    pub global_id: String,
    /// Filesystem every capability delegates to.
    pub vfs: Arc<Vfs>,
    /// Fallback source for system modules.
    pub assets: Arc<dyn AssetSource>,
    /// Runtime handle for spawn/close.
    pub control: Weak<dyn ProcessControl>,
}

/// Per-process capability set.
pub struct CapabilityBridge {
    process_id: ProcessId,
    global_id: String,
    fs: FileCapability,
    storage: AppStorage,
    process: ProcessCapability,
    modules: ModuleLoader,
    topbar: Topbar,
}

impl std::fmt::Debug for CapabilityBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityBridge")
            .field("process_id", &self.process_id)
            .field("global_id", &self.global_id)
            .finish_non_exhaustive()
    }
}

impl CapabilityBridge {
    /// Build the capability set for one process. Every capability acts with
    /// the `user` tag.
    #[must_use]
    pub fn new(ctx: BridgeContext) -> Self {
        let perms = PermissionSet::user();
        Self {
            fs: FileCapability::new(Arc::clone(&ctx.vfs), perms.clone()),
            storage: AppStorage::new(Arc::clone(&ctx.vfs), &ctx.global_id, perms.clone()),
            process: ProcessCapability::new(ctx.control, ctx.process_id),
            modules: ModuleLoader::new(ctx.vfs, ctx.assets, perms),
            topbar: Topbar::new(ctx.process_id),
            process_id: ctx.process_id,
            global_id: ctx.global_id,
        }
    }

    /// Owning process.
    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    /// Manifest identity.
    #[must_use]
    pub fn global_id(&self) -> &str {
        &self.global_id
    }

    /// File access.
    #[must_use]
    pub fn fs(&self) -> &FileCapability {
        &self.fs
    }

    /// Private storage under the application's identity.
    #[must_use]
    pub fn storage(&self) -> &AppStorage {
        &self.storage
    }

    /// Spawn and self-termination.
    #[must_use]
    pub fn process(&self) -> &ProcessCapability {
        &self.process
    }

    /// System module loading.
    #[must_use]
    pub fn modules(&self) -> &ModuleLoader {
        &self.modules
    }

    /// Window chrome.
    #[must_use]
    pub fn topbar(&self) -> &Topbar {
        &self.topbar
    }
}
