use std::sync::Weak;

use async_trait::async_trait;

use crate::error::{CapsuleError, CapsuleResult};
use crate::process::ProcessId;

/// What the bridge needs from the runtime.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Launch the bundle at `path`.
    async fn launch(&self, path: &str) -> CapsuleResult<ProcessId>;

    /// Terminate `id`. Returns `false` for an unknown id.
    async fn kill(&self, id: ProcessId) -> bool;
}

/// Spawn other applications and close the calling one.
///
/// Holds the runtime weakly so a process cannot keep its runtime alive.
pub struct ProcessCapability {
    control: Weak<dyn ProcessControl>,
    self_id: ProcessId,
}

impl std::fmt::Debug for ProcessCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessCapability")
            .field("self_id", &self.self_id)
            .finish_non_exhaustive()
    }
}

impl ProcessCapability {
    pub(crate) fn new(control: Weak<dyn ProcessControl>, self_id: ProcessId) -> Self {
        Self { control, self_id }
    }

    /// Launch another application.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::RuntimeUnavailable`] after shutdown, or the
    /// launch error.
    pub async fn launch(&self, path: &str) -> CapsuleResult<ProcessId> {
        let control = self.control.upgrade().ok_or(CapsuleError::RuntimeUnavailable)?;
        control.launch(path).await
    }

    /// Terminate the calling process.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::RuntimeUnavailable`] after shutdown.
    pub async fn close(&self) -> CapsuleResult<()> {
        let control = self.control.upgrade().ok_or(CapsuleError::RuntimeUnavailable)?;
        control.kill(self.self_id).await;
        Ok(())
    }
}
