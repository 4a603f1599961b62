//! `boot`: bring the desktop up and report its state.

use anyhow::{Result, bail};
use prism_desktop::{Desktop, DesktopState};
use prism_telemetry::LogBuffer;

/// Lines of system log shown under a crash notice.
const CRASH_LOG_LINES: usize = 20;

/// Print the state, the running processes and the index size.
pub(crate) fn status(desktop: &Desktop) {
    println!("state: {}", desktop.state());
    println!("indexed files: {}", desktop.vfs().index().len());
    for process in desktop.runtime().list() {
        println!(
            "process {}\t{}\t{}",
            process.id, process.global_id, process.path
        );
    }
}

/// Fail with the crash notice and the tail of the system log unless the
/// desktop is running.
pub(crate) fn ensure_running(desktop: &Desktop, system_log: &LogBuffer) -> Result<()> {
    if let DesktopState::Crashed { reason } = desktop.state() {
        eprintln!("System Crash: {reason}");
        for record in system_log.tail(CRASH_LOG_LINES) {
            eprintln!(
                "  {} {:>5} {}: {}",
                record.timestamp.format("%H:%M:%S"),
                record.level,
                record.target,
                record.message
            );
        }
        bail!("desktop crashed during boot");
    }
    Ok(())
}
