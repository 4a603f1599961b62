//! Shared test harness for runtime integration tests.

use std::sync::Arc;
use std::time::Duration;

use prism_capsule::{
    AssetSource, HeadlessEngineFactory, MemoryAssetSource, ProcessRuntime, RuntimeConfig,
    pack_bundle,
};
use prism_storage::MemoryKvStore;
use prism_vfs::{Meta, PermissionSet, Vfs};

/// Runtime wired to an in-memory store, in-memory assets and headless engines.
#[allow(dead_code)]
pub struct Harness {
    pub vfs: Arc<Vfs>,
    pub assets: Arc<MemoryAssetSource>,
    pub engines: HeadlessEngineFactory,
    pub runtime: Arc<ProcessRuntime>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig {
            settle_delay: Duration::ZERO,
            ..RuntimeConfig::default()
        })
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let vfs = Arc::new(Vfs::new(Arc::new(MemoryKvStore::new())));
        let assets = Arc::new(MemoryAssetSource::new());
        let engines = HeadlessEngineFactory::new();
        let runtime = ProcessRuntime::new(
            Arc::clone(&vfs),
            Arc::clone(&assets) as Arc<dyn AssetSource>,
            Arc::new(engines.clone()),
            config,
        );
        Self {
            vfs,
            assets,
            engines,
            runtime,
        }
    }

    /// Pack `files` and store the bundle at `path`.
    pub async fn install(&self, path: &str, files: &[(&str, &str)]) {
        let bundle = pack_bundle(files.iter().map(|(name, body)| (*name, body.as_bytes()))).unwrap();
        self.vfs
            .write_file(path, bundle, &PermissionSet::user(), Meta::new())
            .await
            .unwrap();
    }

    /// Install a well-formed application with the given id.
    pub async fn install_app(&self, path: &str, global_id: &str) {
        let manifest = format!(r#"{{"id":"{global_id}"}}"#);
        self.install(
            path,
            &[
                ("manifest.json", manifest.as_str()),
                ("index.html", "<main></main>"),
                ("main.js", "console.log('hi')"),
            ],
        )
        .await;
    }
}
