use std::fmt;

/// Desktop lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesktopState {
    /// Boot sequence in progress.
    Booting,
    /// Boot completed; applications may be launched.
    Running,
    /// A fatal boot error; the desktop shows the crash notice instead.
    Crashed {
        /// What went wrong.
        reason: String,
    },
    /// Processes are being torn down.
    ShuttingDown,
    /// Shut down; the index has been flushed.
    Stopped,
}

impl DesktopState {
    /// Whether applications may be launched.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for DesktopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Booting => f.write_str("booting"),
            Self::Running => f.write_str("running"),
            Self::Crashed { reason } => write!(f, "System Crash: {reason}"),
            Self::ShuttingDown => f.write_str("shutting down"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}
