use std::sync::Arc;

use prism_vfs::path::join_under;
use prism_vfs::{Content, Meta, PermissionSet, Vfs};

use crate::error::CapsuleResult;

/// Parent of every application's private storage directory.
pub const APP_STORAGE_ROOT: &str = "/system/applicationstorage";

/// Key-value storage under `/system/applicationstorage/<id>/`.
///
/// Scoped by the manifest id, not by the installation: two bundles declaring
/// the same id read and write the same keys.
#[derive(Debug)]
pub struct AppStorage {
    vfs: Arc<Vfs>,
    root: String,
    perms: PermissionSet,
}

impl AppStorage {
    pub(crate) fn new(vfs: Arc<Vfs>, global_id: &str, perms: PermissionSet) -> Self {
        Self {
            vfs,
            root: format!("{APP_STORAGE_ROOT}/{global_id}"),
            perms,
        }
    }

    /// The storage directory.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Read `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` escapes the storage directory or on a
    /// storage failure.
    pub async fn read(&self, key: &str) -> CapsuleResult<Option<Content>> {
        let path = join_under(&self.root, key)?;
        Ok(self.vfs.get_file(&path, &self.perms).await?)
    }

    /// Write `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` escapes the storage directory or on a
    /// storage failure.
    pub async fn write(&self, key: &str, value: impl Into<Content>) -> CapsuleResult<()> {
        let path = join_under(&self.root, key)?;
        Ok(self
            .vfs
            .write_file(&path, value, &self.perms, Meta::new())
            .await?)
    }

    /// Remove `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` escapes the storage directory or on a
    /// storage failure.
    pub async fn remove(&self, key: &str) -> CapsuleResult<()> {
        let path = join_under(&self.root, key)?;
        Ok(self.vfs.delete_file(&path, &self.perms).await?)
    }

    /// Top-level keys, relative to the storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error on a storage failure.
    pub async fn keys(&self) -> CapsuleResult<Vec<String>> {
        let children = self
            .vfs
            .list_dir(&self.root, &self.perms)
            .await?
            .unwrap_or_default();
        let prefix = format!("{}/", self.root);
        Ok(children
            .into_iter()
            .filter_map(|child| child.strip_prefix(&prefix).map(str::to_owned))
            .collect())
    }
}
