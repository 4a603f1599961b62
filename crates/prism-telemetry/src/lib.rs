//! Prism Telemetry - logging setup and the in-memory system log.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - [`LogBuffer`], a `tracing` layer keeping recent events for display
//!
//! # Example
//!
//! ```rust,no_run
//! use prism_telemetry::{LogBuffer, LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), prism_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("prism_vfs=trace");
//!
//! let system_log = LogBuffer::default();
//! setup_logging(&config, Some(system_log.clone()))?;
//!
//! tracing::info!("Desktop booting");
//! assert!(!system_log.is_empty());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod buffer;
mod error;
mod logging;

pub use buffer::{DEFAULT_LOG_CAPACITY, LogBuffer, LogRecord};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
