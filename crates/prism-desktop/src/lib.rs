//! Prism Desktop - boot sequence and lifecycle.
//!
//! [`Desktop::boot`] brings a desktop up over any key-value store:
//!
//! 1. Ensure `/` and `/system` exist.
//! 2. Load the file index from `/system/index.json` and start autosaving it.
//! 3. Store the desktop and application stylesheets, fetching them from the
//!    asset source when missing. No desktop stylesheet is fatal.
//! 4. Install the default applications on first boot.
//!
//! A fatal step leaves the desktop in [`DesktopState::Crashed`] rather than
//! returning an error, mirroring the crash notice a user would see.
//! [`Desktop::shutdown`] kills every process and flushes the index.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod boot;
pub mod config_bridge;
mod desktop;
mod error;
mod state;

pub use boot::{APP_LIST, APPLICATIONS_DIR, DESKTOP_STYLES, SYSTEM_DIR};
pub use config_bridge::{DesktopOptions, asset_source, open_store};
pub use desktop::Desktop;
pub use error::{BootError, BootResult};
pub use state::DesktopState;
