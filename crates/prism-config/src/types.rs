//! Configuration types for the Prism desktop.
//!
//! Like the rest of this crate these types have no dependency on the other
//! prism crates. The desktop converts them into runtime settings at boot.
//! Every struct implements [`Default`] so that a bare `[section]` header
//! produces a working configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where VFS nodes are persisted.
    pub storage: StorageSection,
    /// Filesystem and index behaviour.
    pub vfs: VfsSection,
    /// Process runtime tunables.
    pub runtime: RuntimeSection,
    /// Where system assets, modules and default apps come from.
    pub assets: AssetsSection,
    /// Boot sequence switches.
    pub boot: BootSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// StorageSection
// ---------------------------------------------------------------------------

/// Persistence backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Everything is lost when the process exits.
    #[default]
    Memory,
    /// One file per key under `storage.path`.
    Dir,
}

/// Persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backend kind.
    pub backend: StorageBackend,
    /// Root directory for the `dir` backend.
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// VfsSection
// ---------------------------------------------------------------------------

/// Filesystem settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsSection {
    /// Seconds between index snapshots.
    pub index_flush_interval_secs: u64,
}

impl Default for VfsSection {
    fn default() -> Self {
        Self {
            index_flush_interval_secs: 30,
        }
    }
}

impl VfsSection {
    /// Index autosave period.
    #[must_use]
    pub fn index_flush_interval(&self) -> Duration {
        Duration::from_secs(self.index_flush_interval_secs)
    }
}

// ---------------------------------------------------------------------------
// RuntimeSection
// ---------------------------------------------------------------------------

/// Process runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// Bundle launched in place of one that fails validation.
    pub fallback_app: String,
    /// Consecutive fallback launches allowed before a launch is aborted.
    pub max_fallback_depth: u8,
    /// Milliseconds between binding the bridge and registering the process.
    pub settle_delay_ms: u64,
    /// Stylesheet injected into every application document.
    pub app_styles_path: String,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            fallback_app: "/home/applications/malformedapp.app".to_owned(),
            max_fallback_depth: 1,
            settle_delay_ms: 50,
            app_styles_path: "/system/appstyles.css".to_owned(),
        }
    }
}

impl RuntimeSection {
    /// Settle delay as a [`Duration`].
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// AssetsSection
// ---------------------------------------------------------------------------

/// Asset source kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSourceKind {
    /// Nothing can be fetched.
    #[default]
    None,
    /// A local directory mirroring the asset layout.
    Dir,
    /// An HTTP(S) base URL.
    Http,
}

/// Asset source settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsSection {
    /// Source kind.
    pub source: AssetSourceKind,
    /// Directory or base URL, depending on `source`.
    pub location: Option<String>,
    /// Per-fetch timeout. Absent means fetches may wait indefinitely.
    pub fetch_timeout_secs: Option<u64>,
}

impl AssetsSection {
    /// Fetch timeout as a [`Duration`].
    #[must_use]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// BootSection
// ---------------------------------------------------------------------------

/// Boot sequence switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootSection {
    /// Re-fetch system stylesheets and default apps even when present.
    pub refresh_assets: bool,
    /// Install the default application list on first boot.
    pub install_default_apps: bool,
}

impl Default for BootSection {
    fn default() -> Self {
        Self {
            refresh_assets: false,
            install_default_apps: true,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["prism_vfs=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
