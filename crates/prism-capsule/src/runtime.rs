//! Process runtime.
//!
//! `launch(path)` walks one application through
//! `Requested → Unpacking → Validating → Rendering → Running`:
//!
//! 1. Read the bundle from the VFS as `user`. Missing or forbidden aborts.
//! 2. Decompress it.
//! 3. Validate the manifest. A bad manifest aborts this attempt and
//!    launches the fallback "malformed application" instead, at most
//!    `max_fallback_depth` times in a row.
//! 4. Compose the document and load it into a fresh engine.
//! 5. Sever host references, bind the capability bridge.
//! 6. After the settle delay, insert the process into the table.
//!
//! Every transition is published as a [`ProcessEvent`].

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::BoxFuture;
use prism_vfs::{Content, PermissionSet, Vfs};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

use crate::assets::AssetSource;
use crate::bridge::{BridgeContext, CapabilityBridge, ProcessControl};
use crate::bundle::{AppBundle, unpack_bundle};
use crate::engine::{EngineFactory, HOST_REFERENCES};
use crate::error::{CapsuleError, CapsuleResult};
use crate::loader::AppDocument;
use crate::process::{ProcessEvent, ProcessId, ProcessInfo, ProcessState};
use crate::registry::{ProcessRecord, ProcessTable};

/// Default fallback bundle for applications that fail validation.
pub const DEFAULT_FALLBACK_APP: &str = "/home/applications/malformedapp.app";

/// Default shared application stylesheet.
pub const DEFAULT_APP_STYLES: &str = "/system/appstyles.css";

/// Capacity of the event channel; slow subscribers lag rather than block.
const EVENT_CAPACITY: usize = 256;

/// Runtime tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Bundle launched when another fails validation.
    pub fallback_app: String,
    /// How many fallback launches may chain before giving up.
    pub max_fallback_depth: u8,
    /// Pause between binding the bridge and registering the process.
    pub settle_delay: Duration,
    /// VFS path of the stylesheet injected into every application.
    pub app_styles_path: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fallback_app: DEFAULT_FALLBACK_APP.to_owned(),
            max_fallback_depth: 1,
            settle_delay: Duration::from_millis(50),
            app_styles_path: DEFAULT_APP_STYLES.to_owned(),
        }
    }
}

/// Launches, tracks and terminates application processes.
pub struct ProcessRuntime {
    me: Weak<Self>,
    vfs: Arc<Vfs>,
    assets: Arc<dyn AssetSource>,
    engines: Arc<dyn EngineFactory>,
    table: ProcessTable,
    events: broadcast::Sender<ProcessEvent>,
    config: RuntimeConfig,
}

impl std::fmt::Debug for ProcessRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRuntime")
            .field("processes", &self.table.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProcessRuntime {
    /// Create a runtime.
    #[must_use]
    pub fn new(
        vfs: Arc<Vfs>,
        assets: Arc<dyn AssetSource>,
        engines: Arc<dyn EngineFactory>,
        config: RuntimeConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            vfs,
            assets,
            engines,
            table: ProcessTable::new(),
            events,
            config,
        })
    }

    /// Runtime settings.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Receive lifecycle events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.events.subscribe()
    }

    /// Running processes, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<ProcessInfo> {
        self.table.list()
    }

    /// The bridge bound into process `id`.
    #[must_use]
    pub fn bridge(&self, id: &ProcessId) -> Option<Arc<CapabilityBridge>> {
        self.table.get(id).map(|record| Arc::clone(&record.bridge))
    }

    fn emit(&self, event: ProcessEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn transition(&self, id: ProcessId, path: &str, state: ProcessState) {
        debug!(process_id = %id, path = %path, state = %state, "Process transition");
        self.emit(ProcessEvent::Transition {
            process_id: id,
            path: path.to_owned(),
            state,
        });
    }

    fn fail(&self, id: ProcessId, path: &str, err: CapsuleError) -> CapsuleError {
        error!(process_id = %id, path = %path, error = %err, "Launch failed");
        self.emit(ProcessEvent::LaunchFailed {
            process_id: id,
            path: path.to_owned(),
            reason: err.to_string(),
        });
        err
    }

    /// Launch the bundle at `path`.
    ///
    /// Returns the id of the process that ended up running, which is the
    /// fallback application's if `path` failed validation.
    ///
    /// # Errors
    ///
    /// - [`CapsuleError::NotFound`] if no readable bundle is at `path`.
    /// - [`CapsuleError::LaunchAborted`] once the fallback budget is spent.
    /// - Archive, engine and storage errors as they occur.
    pub async fn launch(&self, path: &str) -> CapsuleResult<ProcessId> {
        self.launch_at_depth(path.to_owned(), 0).await
    }

    fn launch_at_depth(&self, path: String, depth: u8) -> BoxFuture<'_, CapsuleResult<ProcessId>> {
        Box::pin(async move {
            let id = ProcessId::new();
            info!(process_id = %id, path = %path, depth, "Request to execute application");
            self.transition(id, &path, ProcessState::Requested);

            let user = PermissionSet::user();
            let archive = match self.vfs.get_file(&path, &user).await {
                Ok(Some(content)) => content_bytes(content).map_err(|e| self.fail(id, &path, e))?,
                Ok(None) => {
                    return Err(self.fail(id, &path, CapsuleError::NotFound(path.clone())));
                },
                Err(e) => return Err(self.fail(id, &path, e.into())),
            };

            self.transition(id, &path, ProcessState::Unpacking);
            let files = unpack_bundle(&archive).map_err(|e| self.fail(id, &path, e))?;

            self.transition(id, &path, ProcessState::Validating);
            let bundle = match AppBundle::from_files(&files) {
                Ok(bundle) => bundle,
                Err(e) => {
                    let reason = e.to_string();
                    let _ = self.fail(id, &path, e);
                    if depth >= self.config.max_fallback_depth {
                        return Err(CapsuleError::LaunchAborted { path, reason });
                    }
                    warn!(path = %path, fallback = %self.config.fallback_app, "Launching fallback application");
                    let next_depth = depth.saturating_add(1);
                    return self
                        .launch_at_depth(self.config.fallback_app.clone(), next_depth)
                        .await;
                },
            };
            let global_id = bundle.manifest.global_id.clone();

            self.transition(id, &path, ProcessState::Rendering);
            let stylesheet = self.app_stylesheet().await;
            let title = prism_vfs::path::basename(&path).to_owned();
            let document = AppDocument::compose(&title, &bundle, stylesheet);

            let mut engine = self.engines.create(id);
            engine
                .load(&document)
                .await
                .map_err(|e| self.fail(id, &path, e))?;

            for reference in HOST_REFERENCES {
                if let Err(e) = engine.sever(reference) {
                    warn!(process_id = %id, reference, error = %e, "Could not sever host reference");
                }
            }

            let control: Weak<dyn ProcessControl> = self.me.clone();
            let bridge = Arc::new(CapabilityBridge::new(BridgeContext {
                process_id: id,
                global_id: global_id.clone(),
                vfs: Arc::clone(&self.vfs),
                assets: Arc::clone(&self.assets),
                control,
            }));
            if let Err(e) = engine.bind(Arc::clone(&bridge)) {
                // Best-effort teardown of a context that never became addressable.
                let _ = engine.unload().await;
                return Err(self.fail(id, &path, e));
            }
            debug!(process_id = %id, global_id = %global_id, "System APIs injected");

            tokio::time::sleep(self.config.settle_delay).await;
            self.table.insert(
                id,
                ProcessRecord {
                    path: path.clone(),
                    global_id: global_id.clone(),
                    started_at: Utc::now(),
                    bridge,
                    engine: Mutex::new(engine),
                },
            );
            self.transition(id, &path, ProcessState::Running);
            info!(process_id = %id, path = %path, global_id = %global_id, "Application running");
            Ok(id)
        })
    }

    async fn app_stylesheet(&self) -> String {
        match self
            .vfs
            .get_file(&self.config.app_styles_path, &PermissionSet::user())
            .await
        {
            Ok(Some(Content::Text(css))) => css,
            Ok(Some(other)) => other
                .to_bytes()
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default(),
            Ok(None) => {
                debug!(path = %self.config.app_styles_path, "No application stylesheet");
                String::new()
            },
            Err(e) => {
                warn!(path = %self.config.app_styles_path, error = %e, "Could not read application stylesheet");
                String::new()
            },
        }
    }

    /// Terminate process `id`.
    ///
    /// Returns `false` (with a warning) for an unknown id. The context is
    /// torn down immediately; bridge calls it already issued may still
    /// complete afterwards.
    pub async fn kill(&self, id: ProcessId) -> bool {
        let Some(record) = self.table.remove(&id) else {
            warn!(process_id = %id, "Unable to find process");
            return false;
        };
        if let Err(e) = record.engine.lock().await.unload().await {
            warn!(process_id = %id, error = %e, "Engine unload error");
        }
        self.transition(id, &record.path, ProcessState::Terminated);
        info!(process_id = %id, path = %record.path, "Process terminated");
        true
    }

    /// Terminate every process.
    pub async fn kill_all(&self) {
        for id in self.table.ids() {
            self.kill(id).await;
        }
    }
}

#[async_trait]
impl ProcessControl for ProcessRuntime {
    async fn launch(&self, path: &str) -> CapsuleResult<ProcessId> {
        ProcessRuntime::launch(self, path).await
    }

    async fn kill(&self, id: ProcessId) -> bool {
        ProcessRuntime::kill(self, id).await
    }
}

fn content_bytes(content: Content) -> CapsuleResult<Vec<u8>> {
    match content {
        Content::Binary(bytes) => Ok(bytes),
        other => Ok(other.to_bytes().map_err(prism_vfs::VfsError::from)?),
    }
}
