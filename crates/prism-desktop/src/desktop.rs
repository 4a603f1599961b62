//! The desktop: owns the VFS, the process runtime and the index autosave
//! task, and runs the boot sequence.

use std::sync::{Arc, Mutex, PoisonError};

use prism_capsule::{AssetSource, EngineFactory, ProcessId, ProcessRuntime};
use prism_storage::KvStore;
use prism_vfs::{IndexEntry, Vfs, spawn_autosave};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::boot;
use crate::config_bridge::DesktopOptions;
use crate::error::{BootError, BootResult};
use crate::state::DesktopState;

/// A booted (or crashed) desktop.
pub struct Desktop {
    vfs: Arc<Vfs>,
    assets: Arc<dyn AssetSource>,
    runtime: Arc<ProcessRuntime>,
    autosave: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<DesktopState>,
    options: DesktopOptions,
}

impl std::fmt::Debug for Desktop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desktop")
            .field("state", &*self.state.borrow())
            .field("runtime", &self.runtime)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Desktop {
    /// Boot a desktop over `store`.
    ///
    /// Never fails: a fatal boot error leaves the desktop in
    /// [`DesktopState::Crashed`] with the index autosave still running, so
    /// whatever was written before the crash is kept.
    pub async fn boot(
        store: Arc<dyn KvStore>,
        assets: Arc<dyn AssetSource>,
        engines: Arc<dyn EngineFactory>,
        options: DesktopOptions,
    ) -> Self {
        let vfs = Arc::new(Vfs::new(store));
        let runtime = ProcessRuntime::new(
            Arc::clone(&vfs),
            Arc::clone(&assets),
            engines,
            options.runtime.clone(),
        );
        let (state, _) = watch::channel(DesktopState::Booting);
        let desktop = Self {
            vfs,
            assets,
            runtime,
            autosave: Mutex::new(None),
            state,
            options,
        };

        info!("Booting desktop");
        match desktop.run_boot_sequence().await {
            Ok(()) => {
                desktop.state.send_replace(DesktopState::Running);
                info!("Desktop initialized successfully");
            },
            Err(e) => desktop.crash(&e.to_string()),
        }
        desktop
    }

    async fn run_boot_sequence(&self) -> BootResult<()> {
        boot::ensure_system_dirs(&self.vfs).await?;

        self.vfs.index().load(&self.vfs).await?;
        info!(entries = self.vfs.index().len(), "Index loaded");

        let handle = spawn_autosave(Arc::clone(&self.vfs), self.options.index_flush_interval);
        if let Some(previous) = self
            .autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            previous.abort();
        }

        boot::ensure_system_assets(
            &self.vfs,
            self.assets.as_ref(),
            &self.options.runtime.app_styles_path,
            self.options.refresh_assets,
        )
        .await?;

        if self.options.install_default_apps {
            boot::install_default_apps(&self.vfs, self.assets.as_ref(), self.options.refresh_assets)
                .await?;
        }
        Ok(())
    }

    fn crash(&self, reason: &str) {
        error!(reason, "System crash");
        self.state.send_replace(DesktopState::Crashed {
            reason: reason.to_owned(),
        });
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DesktopState {
        self.state.borrow().clone()
    }

    /// Observe lifecycle changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<DesktopState> {
        self.state.subscribe()
    }

    /// The filesystem.
    #[must_use]
    pub fn vfs(&self) -> &Arc<Vfs> {
        &self.vfs
    }

    /// The process runtime.
    #[must_use]
    pub fn runtime(&self) -> &Arc<ProcessRuntime> {
        &self.runtime
    }

    /// Options the desktop was booted with.
    #[must_use]
    pub fn options(&self) -> &DesktopOptions {
        &self.options
    }

    fn ensure_running(&self) -> BootResult<()> {
        match self.state() {
            DesktopState::Running => Ok(()),
            DesktopState::Crashed { reason } => Err(BootError::Crashed(reason)),
            other => Err(BootError::Crashed(format!("desktop is {other}"))),
        }
    }

    /// Files whose name contains `query`, case-insensitively.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<IndexEntry> {
        self.vfs.index().search(query)
    }

    /// Launch the application bundle at `path`.
    ///
    /// # Errors
    ///
    /// [`BootError::Crashed`] unless the desktop is running, otherwise any
    /// launch error from the runtime.
    pub async fn launch(&self, path: &str) -> BootResult<ProcessId> {
        self.ensure_running()?;
        Ok(self.runtime.launch(path).await?)
    }

    /// Store `bundle` as `/home/applications/<name>` after checking its
    /// manifest. Returns the installed path.
    ///
    /// # Errors
    ///
    /// [`BootError::Crashed`] unless the desktop is running, a capsule error
    /// for a malformed bundle, or a VFS error for an unusable name.
    pub async fn install_bundle(&self, name: &str, bundle: Vec<u8>) -> BootResult<String> {
        self.ensure_running()?;
        boot::install_bundle(&self.vfs, name, bundle).await
    }

    /// Kill every process, stop autosave and flush the index one last time.
    ///
    /// # Errors
    ///
    /// Returns a VFS error if the final flush fails.
    pub async fn shutdown(&self) -> BootResult<()> {
        let crashed = matches!(self.state(), DesktopState::Crashed { .. });
        if !crashed {
            self.state.send_replace(DesktopState::ShuttingDown);
        }
        info!("Shutting down desktop");

        self.runtime.kill_all().await;

        let autosave = self
            .autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = autosave {
            handle.abort();
        }

        if let Err(e) = self.vfs.index().flush(&self.vfs).await {
            warn!(error = %e, "Final index flush failed");
            return Err(e.into());
        }

        if !crashed {
            self.state.send_replace(DesktopState::Stopped);
        }
        info!("Desktop stopped");
        Ok(())
    }
}
