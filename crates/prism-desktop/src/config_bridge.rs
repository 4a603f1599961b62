//! Bridge from [`prism_config::Config`] to the desktop's collaborators.
//!
//! Opens the configured store and asset source and derives the runtime
//! and boot settings, so hosts only deal with the unified config.

use std::sync::Arc;
use std::time::Duration;

use prism_capsule::{
    AssetSource, DirAssetSource, HttpAssetSource, NoAssets, RuntimeConfig,
};
use prism_config::{AssetSourceKind, Config, StorageBackend};
use prism_storage::{DirKvStore, KvStore, MemoryKvStore};
use tracing::info;

use crate::error::{BootError, BootResult};

/// Everything [`Desktop::boot`](crate::Desktop::boot) needs besides its
/// collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopOptions {
    /// Process runtime settings.
    pub runtime: RuntimeConfig,
    /// Index autosave period.
    pub index_flush_interval: Duration,
    /// Re-fetch system assets and default apps even when present.
    pub refresh_assets: bool,
    /// Install the default application list when it is missing.
    pub install_default_apps: bool,
}

impl Default for DesktopOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DesktopOptions {
    /// Derive options from the unified config.
    #[must_use]
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            runtime: RuntimeConfig {
                fallback_app: cfg.runtime.fallback_app.clone(),
                max_fallback_depth: cfg.runtime.max_fallback_depth,
                settle_delay: cfg.runtime.settle_delay(),
                app_styles_path: cfg.runtime.app_styles_path.clone(),
            },
            index_flush_interval: cfg.vfs.index_flush_interval(),
            refresh_assets: cfg.boot.refresh_assets,
            install_default_apps: cfg.boot.install_default_apps,
        }
    }
}

/// Open the configured persistence backend.
///
/// # Errors
///
/// Returns [`BootError::Storage`] if the store directory cannot be opened,
/// or a storage error if the `dir` backend has no path.
pub async fn open_store(cfg: &Config) -> BootResult<Arc<dyn KvStore>> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage; nothing will persist");
            Ok(Arc::new(MemoryKvStore::new()))
        },
        StorageBackend::Dir => {
            let path = cfg.storage.path.as_ref().ok_or_else(|| {
                BootError::Storage(prism_storage::StorageError::Connection(
                    "dir backend configured without a path".into(),
                ))
            })?;
            let store = DirKvStore::open(path).await?;
            info!(path = %path.display(), "Opened storage directory");
            Ok(Arc::new(store))
        },
    }
}

/// Build the configured asset source.
///
/// # Errors
///
/// Returns [`BootError::MissingAsset`] if a `dir`/`http` source has no
/// location, or a capsule error if the HTTP client cannot be built.
pub fn asset_source(cfg: &Config) -> BootResult<Arc<dyn AssetSource>> {
    let location = || {
        cfg.assets
            .location
            .clone()
            .ok_or_else(|| BootError::MissingAsset {
                path: "assets.location".into(),
            })
    };
    Ok(match cfg.assets.source {
        AssetSourceKind::None => Arc::new(NoAssets),
        AssetSourceKind::Dir => Arc::new(DirAssetSource::new(location()?)),
        AssetSourceKind::Http => {
            Arc::new(HttpAssetSource::new(location()?, cfg.assets.fetch_timeout())?)
        },
    })
}
