//! Shared fixtures for desktop integration tests.

use std::sync::Arc;
use std::time::Duration;

use prism_capsule::{AssetSource, HeadlessEngineFactory, MemoryAssetSource, pack_bundle};
use prism_desktop::{Desktop, DesktopOptions};
use prism_storage::{KvStore, MemoryKvStore};

pub const DESKTOP_CSS: &str = "body { background: teal; }";
pub const APP_CSS: &str = "button { border: 0; }";

/// Desktop options with no settle delay.
pub fn options() -> DesktopOptions {
    let mut options = DesktopOptions::default();
    options.runtime.settle_delay = Duration::ZERO;
    options
}

/// A bundle with the given manifest (or none).
pub fn bundle(manifest: Option<&str>) -> Vec<u8> {
    let mut files: Vec<(&str, &[u8])> = vec![
        ("index.html", b"<main></main>".as_slice()),
        ("main.js", b"console.log('hi')".as_slice()),
    ];
    if let Some(manifest) = manifest {
        files.push(("manifest.json", manifest.as_bytes()));
    }
    pack_bundle(files).unwrap()
}

/// A store, an asset source stocked like a real deployment, and headless
/// engines.
#[allow(dead_code)]
pub struct Harness {
    pub store: Arc<dyn KvStore>,
    pub assets: Arc<MemoryAssetSource>,
    pub engines: HeadlessEngineFactory,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryKvStore::new()))
    }

    pub fn with_store(store: Arc<dyn KvStore>) -> Self {
        let assets = MemoryAssetSource::new()
            .with("css/desktop.css", DESKTOP_CSS)
            .with("css/defaultapp.css", APP_CSS)
            .with(
                "app/list.json",
                r#"["notes.app", "secret.app", "broken.app", "ghost.app"]"#,
            )
            .with("app/notes.app", bundle(Some(r#"{"id":"notes"}"#)))
            .with("app/secret.app", bundle(Some(r#"{"id":"secret","hidden":true}"#)))
            .with("app/broken.app", bundle(None));
        Self {
            store,
            assets: Arc::new(assets),
            engines: HeadlessEngineFactory::new(),
        }
    }

    pub async fn boot(&self) -> Desktop {
        self.boot_with(options()).await
    }

    pub async fn boot_with(&self, options: DesktopOptions) -> Desktop {
        Desktop::boot(
            Arc::clone(&self.store),
            Arc::clone(&self.assets) as Arc<dyn AssetSource>,
            Arc::new(self.engines.clone()),
            options,
        )
        .await
    }
}
