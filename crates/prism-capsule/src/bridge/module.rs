use std::sync::Arc;

use prism_vfs::{Content, Meta, PermissionSet, Vfs};
use tracing::{debug, error, info};

use crate::assets::AssetSource;
use crate::error::{CapsuleError, CapsuleResult};

/// Local cache of fetched system modules.
pub const MODULE_DIR: &str = "/system/modules";

/// A loaded module, ready for the engine to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    /// Module name as requested.
    pub name: String,
    /// Module source text.
    pub source: String,
}

/// Resolves system modules: local cache first, then the asset source.
pub struct ModuleLoader {
    vfs: Arc<Vfs>,
    assets: Arc<dyn AssetSource>,
    perms: PermissionSet,
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader").finish_non_exhaustive()
    }
}

impl ModuleLoader {
    pub(crate) fn new(vfs: Arc<Vfs>, assets: Arc<dyn AssetSource>, perms: PermissionSet) -> Self {
        Self { vfs, assets, perms }
    }

    /// Load module `name`.
    ///
    /// A module fetched from the asset source is cached under
    /// [`MODULE_DIR`] for next time.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::ModuleUnavailable`] if the name is not a
    /// single path segment or neither location has it.
    pub async fn load(&self, name: &str) -> CapsuleResult<ModuleHandle> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(CapsuleError::ModuleUnavailable(format!(
                "'{name}' is not a module name"
            )));
        }
        let cached_path = format!("{MODULE_DIR}/{name}");

        if let Some(content) = self.vfs.get_file(&cached_path, &self.perms).await? {
            debug!(module = %name, "Module served from local cache");
            return Ok(ModuleHandle {
                name: name.to_owned(),
                source: module_text(content)?,
            });
        }

        let fetched = match self.assets.fetch(&format!("modules/{name}")).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                error!(module = %name, "Unable to find module");
                return Err(CapsuleError::ModuleUnavailable(name.to_owned()));
            },
            Err(e) => {
                error!(module = %name, error = %e, "Module fetch failed");
                return Err(CapsuleError::ModuleUnavailable(format!("{name}: {e}")));
            },
        };

        let source = String::from_utf8_lossy(&fetched).into_owned();
        self.vfs
            .write_file(&cached_path, Content::Text(source.clone()), &self.perms, Meta::new())
            .await?;
        info!(module = %name, "Fetched and cached module");
        Ok(ModuleHandle {
            name: name.to_owned(),
            source,
        })
    }
}

fn module_text(content: Content) -> CapsuleResult<String> {
    match content {
        Content::Text(text) => Ok(text),
        other => {
            let bytes = other.to_bytes().map_err(prism_vfs::VfsError::from)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        },
    }
}
