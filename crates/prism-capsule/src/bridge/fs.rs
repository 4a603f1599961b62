use std::sync::Arc;

use prism_vfs::{Content, Meta, Node, PermissionSet, Vfs};

use crate::error::CapsuleResult;

/// File operations on the shared tree, with a fixed caller permission set.
///
/// Denied and missing paths behave exactly as in the VFS: absent reads and
/// silent no-op writes.
#[derive(Debug)]
pub struct FileCapability {
    vfs: Arc<Vfs>,
    perms: PermissionSet,
}

impl FileCapability {
    pub(crate) fn new(vfs: Arc<Vfs>, perms: PermissionSet) -> Self {
        Self { vfs, perms }
    }

    /// Write a file, creating its parent if needed.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path or a storage failure.
    pub async fn write_file(&self, path: &str, content: impl Into<Content>, meta: Meta) -> CapsuleResult<()> {
        Ok(self.vfs.write_file(path, content, &self.perms, meta).await?)
    }

    /// Read a file's payload.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path or a storage failure.
    pub async fn read_file(&self, path: &str) -> CapsuleResult<Option<Content>> {
        Ok(self.vfs.get_file(path, &self.perms).await?)
    }

    /// File metadata with the payload stripped.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path or a storage failure.
    pub async fn file_info(&self, path: &str) -> CapsuleResult<Option<Node>> {
        Ok(self
            .vfs
            .get_file_data(path, &self.perms)
            .await?
            .map(|node| node.without_content()))
    }

    /// Delete a file or a directory tree.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path or a storage failure.
    pub async fn delete(&self, path: &str) -> CapsuleResult<()> {
        Ok(self.vfs.delete_file(path, &self.perms).await?)
    }

    /// Create a directory and any missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path or a storage failure.
    pub async fn make_dir(&self, path: &str, meta: Meta) -> CapsuleResult<()> {
        Ok(self.vfs.make_dir(path, &self.perms, meta).await?)
    }

    /// Child paths of a directory.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path or a storage failure.
    pub async fn list_dir(&self, path: &str) -> CapsuleResult<Option<Vec<String>>> {
        Ok(self.vfs.list_dir(path, &self.perms).await?)
    }
}
