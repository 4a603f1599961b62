//! External asset sources.
//!
//! The desktop fetches stylesheets, default application bundles and system
//! modules from outside the VFS. [`AssetSource`] is that seam: a read-only
//! lookup by relative path such as `modules/ContextMenu.js`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CapsuleError, CapsuleResult};

/// Read-only source of desktop assets.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the asset at `path`. `Ok(None)` means the source does not have it.
    async fn fetch(&self, path: &str) -> CapsuleResult<Option<Vec<u8>>>;
}

/// Reject anything that is not a plain relative path.
fn validate_asset_path(path: &str) -> CapsuleResult<()> {
    let invalid = || CapsuleError::Asset {
        path: path.to_owned(),
        message: "asset paths must be relative and stay inside the source".into(),
    };
    if path.is_empty() {
        return Err(invalid());
    }
    for component in Path::new(path).components() {
        if !matches!(component, Component::Normal(_) | Component::CurDir) {
            return Err(invalid());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Empty
// ---------------------------------------------------------------------------

/// A source with nothing in it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAssets;

#[async_trait]
impl AssetSource for NoAssets {
    async fn fetch(&self, _path: &str) -> CapsuleResult<Option<Vec<u8>>> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Assets held in memory. Used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryAssetSource {
    assets: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryAssetSource {
    /// An empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.assets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), bytes.into());
    }

    /// Builder-style [`MemoryAssetSource::insert`].
    #[must_use]
    pub fn with(self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

#[async_trait]
impl AssetSource for MemoryAssetSource {
    async fn fetch(&self, path: &str) -> CapsuleResult<Option<Vec<u8>>> {
        Ok(self
            .assets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Host directory
// ---------------------------------------------------------------------------

/// Assets read from a host directory.
#[derive(Debug, Clone)]
pub struct DirAssetSource {
    root: PathBuf,
}

impl DirAssetSource {
    /// A source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetSource for DirAssetSource {
    async fn fetch(&self, path: &str) -> CapsuleResult<Option<Vec<u8>>> {
        validate_asset_path(path)?;
        let file = self.root.join(path);
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = %file.display(), "Asset not found");
                Ok(None)
            },
            Err(e) => Err(CapsuleError::Io(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Assets fetched over HTTP(S) relative to a base URL.
///
/// Without a timeout a stalled server stalls the caller.
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    base: String,
    client: reqwest::Client,
}

impl HttpAssetSource {
    /// A source under `base` (e.g. `https://example.org/desktop`).
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::Asset`] if the HTTP client cannot be built.
    pub fn new(base: impl Into<String>, timeout: Option<Duration>) -> CapsuleResult<Self> {
        let base = base.into();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| CapsuleError::Asset {
            path: base.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            base: base.trim_end_matches('/').to_owned(),
            client,
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches("./"))
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch(&self, path: &str) -> CapsuleResult<Option<Vec<u8>>> {
        validate_asset_path(path)?;
        let url = self.url_for(path);
        let transport = |e: reqwest::Error| CapsuleError::Asset {
            path: path.to_owned(),
            message: e.to_string(),
        };

        let response = self.client.get(&url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            debug!(url = %url, status = %response.status(), "Asset not available");
            return Ok(None);
        }
        let body = response.bytes().await.map_err(transport)?;
        Ok(Some(body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemoryAssetSource::new().with("css/desktop.css", "body{}");
        assert_eq!(
            source.fetch("css/desktop.css").await.unwrap(),
            Some(b"body{}".to_vec())
        );
        assert!(source.fetch("css/other.css").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dir_source_reads_and_misses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("modules")).unwrap();
        std::fs::write(dir.path().join("modules/Menu.js"), "export {}").unwrap();

        let source = DirAssetSource::new(dir.path());
        assert_eq!(
            source.fetch("modules/Menu.js").await.unwrap(),
            Some(b"export {}".to_vec())
        );
        assert!(source.fetch("modules/Nope.js").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dir_source_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirAssetSource::new(dir.path());
        assert!(source.fetch("../secret").await.is_err());
        assert!(source.fetch("/etc/passwd").await.is_err());
    }

    #[test]
    fn test_http_url_join() {
        let source = HttpAssetSource::new("https://example.org/desktop/", None).unwrap();
        assert_eq!(
            source.url_for("app/list.json"),
            "https://example.org/desktop/app/list.json"
        );
    }
}
