//! Process identity, lifecycle states and events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, globally unique process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(Uuid);

impl ProcessId {
    /// A fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProcessId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle of one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// `launch(path)` was called.
    Requested,
    /// The bundle was read and is being decompressed.
    Unpacking,
    /// The manifest is being checked.
    Validating,
    /// The execution context is loading the document.
    Rendering,
    /// Bridge bound and process addressable.
    Running,
    /// Killed or closed.
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Requested => "requested",
            Self::Unpacking => "unpacking",
            Self::Validating => "validating",
            Self::Rendering => "rendering",
            Self::Running => "running",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Published by the runtime for hosts that track processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProcessEvent {
    /// A launch or process moved to `state`.
    Transition {
        /// Process (or launch attempt) id.
        process_id: ProcessId,
        /// Bundle path.
        path: String,
        /// New state.
        state: ProcessState,
    },
    /// A launch attempt ended before `Running`.
    LaunchFailed {
        /// Id of the abandoned attempt.
        process_id: ProcessId,
        /// Bundle path.
        path: String,
        /// Failure description.
        reason: String,
    },
}

impl ProcessEvent {
    /// Id the event refers to.
    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        match self {
            Self::Transition { process_id, .. } | Self::LaunchFailed { process_id, .. } => {
                *process_id
            },
        }
    }

    /// Bundle path the event refers to.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Transition { path, .. } | Self::LaunchFailed { path, .. } => path,
        }
    }
}

/// Snapshot of a running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    /// Process id.
    pub id: ProcessId,
    /// Bundle path it was launched from.
    pub path: String,
    /// Manifest identity.
    pub global_id: String,
    /// When it became `Running`.
    pub started_at: DateTime<Utc>,
}
