//! The hierarchical filesystem over a [`KvStore`].
//!
//! Every node is a JSON document stored under its own absolute path. A
//! directory lists its children's paths, and the tree is kept consistent by
//! linking each new node into its parent and unlinking on delete.
//!
//! Access is tag based (see [`PermissionSet`]). A caller that may not touch a
//! node sees exactly what it would see if the node did not exist: reads return
//! `Ok(None)` and mutations return `Ok(())` without effect.

use std::sync::Arc;

use chrono::Utc;
use futures::future::BoxFuture;
use prism_storage::KvStore;
use tracing::{debug, warn};

use crate::error::{VfsError, VfsResult};
use crate::index::{FileIndex, IndexEntry};
use crate::locks::PathLocks;
use crate::mime;
use crate::node::{Content, Meta, Node, NodeBody};
use crate::path::{self, ROOT};
use crate::permissions::PermissionSet;

/// Permission-gated virtual filesystem.
pub struct Vfs {
    store: Arc<dyn KvStore>,
    index: Arc<FileIndex>,
    locks: PathLocks,
}

impl std::fmt::Debug for Vfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vfs")
            .field("indexed_files", &self.index.len())
            .finish_non_exhaustive()
    }
}

impl Vfs {
    /// A filesystem over `store` with a fresh, empty index.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_index(store, Arc::new(FileIndex::new()))
    }

    /// A filesystem over `store` that maintains `index`.
    #[must_use]
    pub fn with_index(store: Arc<dyn KvStore>, index: Arc<FileIndex>) -> Self {
        Self {
            store,
            index,
            locks: PathLocks::new(),
        }
    }

    /// The file index this filesystem keeps current.
    #[must_use]
    pub fn index(&self) -> &Arc<FileIndex> {
        &self.index
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Raw node access
    // -----------------------------------------------------------------------

    async fn read_node(&self, path: &str) -> VfsResult<Option<Node>> {
        let Some(raw) = self.store.get(path).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| VfsError::Corrupt {
                path: path.to_owned(),
                source,
            })
    }

    async fn put_node(&self, path: &str, node: &Node) -> VfsResult<()> {
        let raw = serde_json::to_vec(node)?;
        self.store.set(path, raw).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Whether a node exists at `path`. No permission check.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path or a store failure.
    pub async fn exists(&self, path: &str) -> VfsResult<bool> {
        let path = path::normalize(path)?;
        Ok(self.store.exists(&path).await?)
    }

    /// Whether `perms` may act on the node at `path`.
    ///
    /// An absent node is allowed, as is a node with no tags.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path or a store failure.
    pub async fn check_perms(&self, path: &str, perms: &PermissionSet) -> VfsResult<bool> {
        let path = path::normalize(path)?;
        Ok(self
            .read_node(&path)
            .await?
            .is_none_or(|node| node.permissions.admits(perms)))
    }

    /// Payload of the file at `path`.
    ///
    /// `None` if the node is missing, is a directory, or is not visible to
    /// `perms`.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path, a store failure, or a corrupt node.
    pub async fn get_file(&self, path: &str, perms: &PermissionSet) -> VfsResult<Option<Content>> {
        Ok(self
            .get_file_data(path, perms)
            .await?
            .and_then(|node| match node.body {
                NodeBody::File { content, .. } => Some(content),
                NodeBody::Dir { .. } => None,
            }))
    }

    /// The whole file node at `path`, under the same rules as [`Vfs::get_file`].
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path, a store failure, or a corrupt node.
    pub async fn get_file_data(&self, path: &str, perms: &PermissionSet) -> VfsResult<Option<Node>> {
        Ok(self.stat(path, perms).await?.filter(Node::is_file))
    }

    /// The node at `path`, file or directory, if visible to `perms`.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path, a store failure, or a corrupt node.
    pub async fn stat(&self, path: &str, perms: &PermissionSet) -> VfsResult<Option<Node>> {
        let path = path::normalize(path)?;
        match self.read_node(&path).await? {
            None => {
                debug!(path = %path, "Node not found");
                Ok(None)
            },
            Some(node) if !node.permissions.admits(perms) => {
                debug!(path = %path, caller = %perms, "Permission denied");
                Ok(None)
            },
            Some(node) => Ok(Some(node)),
        }
    }

    /// Ordered child paths of the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path, a store failure, or a corrupt node.
    pub async fn list_dir(&self, path: &str, perms: &PermissionSet) -> VfsResult<Option<Vec<String>>> {
        Ok(self
            .stat(path, perms)
            .await?
            .and_then(|node| match node.body {
                NodeBody::Dir { content } => Some(content),
                NodeBody::File { .. } => None,
            }))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create the directory at `path`, tagged with `perms`.
    ///
    /// Missing ancestors are created first with the same tags. The caller
    /// must be admitted by the parent. Does nothing if `path` already exists.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path, a store failure, or a corrupt node.
    pub async fn make_dir(&self, path: &str, perms: &PermissionSet, meta: Meta) -> VfsResult<()> {
        let path = path::normalize(path)?;
        self.make_dir_inner(path, perms, meta).await
    }

    fn make_dir_inner<'a>(
        &'a self,
        path: String,
        perms: &'a PermissionSet,
        meta: Meta,
    ) -> BoxFuture<'a, VfsResult<()>> {
        Box::pin(async move {
            let _guard = self.locks.lock(&path).await;
            if self.store.exists(&path).await? {
                return Ok(());
            }

            if path::is_root(&path) {
                self.put_node(ROOT, &Node::dir(perms.clone(), meta)).await?;
                debug!(caller = %perms, "Created root directory");
                return Ok(());
            }

            let parent = path::dirname(&path);
            if !self.store.exists(&parent).await? {
                self.make_dir_inner(parent.clone(), perms, Meta::new()).await?;
            }

            let node = Node::dir(perms.clone(), meta);
            if self.persist_linked(&path, &parent, &node, perms).await? {
                debug!(path = %path, "Created directory");
            }
            Ok(())
        })
    }

    /// Write `content` to the file at `path`, tagged with `perms`.
    ///
    /// The parent directory is created if missing. The caller must be
    /// admitted by the existing file, if any. The mimetype is sniffed from
    /// the payload and `created` survives overwrites. A directory is never
    /// replaced by a file.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidPath`] for the root, or an error on a store
    /// failure or a corrupt node.
    pub async fn write_file(
        &self,
        path: &str,
        content: impl Into<Content>,
        perms: &PermissionSet,
        meta: Meta,
    ) -> VfsResult<()> {
        let path = path::normalize(path)?;
        if path::is_root(&path) {
            return Err(VfsError::InvalidPath("cannot write a file at /".into()));
        }
        let content = content.into();
        let parent = path::dirname(&path);

        let _guard = self.locks.lock(&path).await;
        if !self.store.exists(&parent).await? {
            self.make_dir_inner(parent.clone(), perms, Meta::new()).await?;
        }

        let existing = self.read_node(&path).await?;
        let created = match &existing {
            Some(node) if !node.permissions.admits(perms) => {
                debug!(path = %path, caller = %perms, "Write denied");
                return Ok(());
            },
            Some(node) if node.is_dir() => {
                warn!(path = %path, "Refusing to overwrite a directory with a file");
                return Ok(());
            },
            Some(node) => node.created,
            None => Utc::now(),
        };

        let node = Node {
            body: NodeBody::File {
                mimetype: mime::sniff(&content).to_owned(),
                content,
            },
            created,
            modified: Utc::now(),
            permissions: perms.clone(),
            meta,
        };
        self.persist_linked(&path, &parent, &node, perms).await?;
        Ok(())
    }

    /// Store `node` at `path` and link it into `parent`, holding the parent's
    /// lock so the link cannot race with other children or a parent delete.
    ///
    /// New children need the parent to admit `perms`. Returns `false` (and
    /// persists nothing) if the parent is missing, not a directory, or denies.
    async fn persist_linked(
        &self,
        path: &str,
        parent: &str,
        node: &Node,
        perms: &PermissionSet,
    ) -> VfsResult<bool> {
        let _parent_guard = self.locks.lock(parent).await;
        let Some(mut parent_node) = self.read_node(parent).await? else {
            debug!(path = %path, parent = %parent, "Parent directory unavailable");
            return Ok(false);
        };
        if !parent_node.is_dir() {
            debug!(path = %path, parent = %parent, "Parent is not a directory");
            return Ok(false);
        }
        if node.is_dir() && !parent_node.permissions.admits(perms) {
            debug!(path = %path, caller = %perms, "Permission denied on parent");
            return Ok(false);
        }

        self.put_node(path, node).await?;
        if let Some(entry) = IndexEntry::for_node(path, node) {
            self.index.upsert(entry);
        }

        if parent_node.link(path) {
            parent_node.modified = Utc::now();
            self.put_node(parent, &parent_node).await?;
        }
        Ok(true)
    }

    /// Delete the node at `path`; directories are emptied depth-first.
    ///
    /// The node leaves the store, its parent's listing and the index. Does
    /// nothing if the node is missing or denies `perms`. A directory that
    /// still holds children `perms` could not delete is kept, listing only
    /// those children.
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid path, a store failure, or a corrupt node.
    pub async fn delete_file(&self, path: &str, perms: &PermissionSet) -> VfsResult<()> {
        let path = path::normalize(path)?;
        self.delete_inner(path, perms).await
    }

    fn delete_inner<'a>(&'a self, path: String, perms: &'a PermissionSet) -> BoxFuture<'a, VfsResult<()>> {
        Box::pin(async move {
            let Some(node) = self.read_node(&path).await? else {
                return Ok(());
            };
            if !node.permissions.admits(perms) {
                debug!(path = %path, caller = %perms, "Delete denied");
                return Ok(());
            }

            if let Some(children) = node.children() {
                for child in children.to_vec() {
                    self.delete_inner(child, perms).await?;
                }
            }

            {
                let _guard = self.locks.lock(&path).await;
                let Some(current) = self.read_node(&path).await? else {
                    return Ok(());
                };
                if current.children().is_some_and(|c| !c.is_empty()) {
                    debug!(path = %path, "Directory kept, children remain");
                    return Ok(());
                }
                self.store.delete(&path).await?;
                self.index.remove(&path);
            }

            if !path::is_root(&path) {
                let parent = path::dirname(&path);
                let _parent_guard = self.locks.lock(&parent).await;
                if let Some(mut parent_node) = self.read_node(&parent).await?
                    && parent_node.unlink(&path)
                {
                    parent_node.modified = Utc::now();
                    self.put_node(&parent, &parent_node).await?;
                }
            }
            debug!(path = %path, "Deleted node");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use prism_storage::MemoryKvStore;

    use super::*;

    fn vfs() -> Vfs {
        Vfs::new(Arc::new(MemoryKvStore::new()))
    }

    fn user() -> PermissionSet {
        PermissionSet::user()
    }

    #[tokio::test]
    async fn test_make_dir_creates_root_first() {
        let vfs = vfs();
        vfs.make_dir("/home", &user(), Meta::new()).await.unwrap();
        assert!(vfs.exists("/").await.unwrap());
        assert_eq!(
            vfs.list_dir("/", &user()).await.unwrap().unwrap(),
            vec!["/home"]
        );
    }

    #[tokio::test]
    async fn test_make_dir_is_noop_when_present() {
        let vfs = vfs();
        vfs.make_dir("/home", &user(), Meta::new()).await.unwrap();
        vfs.write_file("/home/a.txt", "a", &user(), Meta::new()).await.unwrap();
        vfs.make_dir("/home", &user(), Meta::new()).await.unwrap();
        assert_eq!(
            vfs.list_dir("/home", &user()).await.unwrap().unwrap(),
            vec!["/home/a.txt"]
        );
    }

    #[tokio::test]
    async fn test_write_file_refuses_root_and_dirs() {
        let vfs = vfs();
        assert!(matches!(
            vfs.write_file("/", "x", &user(), Meta::new()).await,
            Err(VfsError::InvalidPath(_))
        ));
        vfs.make_dir("/d", &user(), Meta::new()).await.unwrap();
        vfs.write_file("/d", "x", &user(), Meta::new()).await.unwrap();
        assert!(vfs.stat("/d", &user()).await.unwrap().unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_get_file_on_dir_is_absent() {
        let vfs = vfs();
        vfs.make_dir("/d", &user(), Meta::new()).await.unwrap();
        assert!(vfs.get_file("/d", &user()).await.unwrap().is_none());
        assert!(vfs.list_dir("/missing", &user()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_denied_mkdir_under_admin_dir() {
        let vfs = vfs();
        vfs.make_dir("/", &PermissionSet::public(), Meta::new()).await.unwrap();
        vfs.make_dir("/root", &PermissionSet::administrator(), Meta::new())
            .await
            .unwrap();
        vfs.make_dir("/root/sub", &user(), Meta::new()).await.unwrap();
        assert!(!vfs.exists("/root/sub").await.unwrap());
    }

    #[tokio::test]
    async fn test_write_under_uncreatable_parent_leaves_no_orphan() {
        let vfs = vfs();
        vfs.make_dir("/", &PermissionSet::public(), Meta::new()).await.unwrap();
        vfs.make_dir("/root", &PermissionSet::administrator(), Meta::new())
            .await
            .unwrap();
        vfs.write_file("/root/sub/f.txt", "x", &user(), Meta::new())
            .await
            .unwrap();
        assert!(!vfs.exists("/root/sub/f.txt").await.unwrap());
        assert!(vfs.index().get("/root/sub/f.txt").is_none());
    }

    #[tokio::test]
    async fn test_corrupt_node_is_an_error() {
        let store = Arc::new(MemoryKvStore::new());
        store.set("/bad", b"not json".to_vec()).await.unwrap();
        let vfs = Vfs::new(store);
        assert!(matches!(
            vfs.stat("/bad", &user()).await,
            Err(VfsError::Corrupt { .. })
        ));
    }

    /// Accepts directories but fails every other write.
    struct FlakyStore {
        inner: MemoryKvStore,
    }

    #[async_trait::async_trait]
    impl KvStore for FlakyStore {
        async fn get(&self, key: &str) -> prism_storage::StorageResult<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>) -> prism_storage::StorageResult<()> {
            if key.ends_with(".txt") {
                return Err(prism_storage::StorageError::Internal("disk full".into()));
            }
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> prism_storage::StorageResult<bool> {
            self.inner.delete(key).await
        }

        async fn list_keys(&self) -> prism_storage::StorageResult<Vec<String>> {
            self.inner.list_keys().await
        }
    }

    #[tokio::test]
    async fn test_failed_write_is_not_indexed() {
        let vfs = Vfs::new(Arc::new(FlakyStore {
            inner: MemoryKvStore::new(),
        }));
        let result = vfs.write_file("/docs/a.txt", "x", &user(), Meta::new()).await;
        assert!(matches!(result, Err(VfsError::Storage(_))));
        assert!(vfs.index().get("/docs/a.txt").is_none());
        assert!(vfs.index().is_empty());
        assert!(vfs.list_dir("/docs", &user()).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_perms() {
        let vfs = vfs();
        vfs.write_file("/a.txt", "x", &user(), Meta::new()).await.unwrap();
        assert!(vfs.check_perms("/a.txt", &user()).await.unwrap());
        assert!(!vfs.check_perms("/a.txt", &PermissionSet::from_iter(["guest"])).await.unwrap());
        assert!(vfs.check_perms("/nothing", &PermissionSet::from_iter(["guest"])).await.unwrap());
    }
}
