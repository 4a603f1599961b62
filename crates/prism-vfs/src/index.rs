//! Flat file index.
//!
//! The [`FileIndex`] keeps one [`IndexEntry`] per *file* so search and
//! listing never walk the tree. It is mutated synchronously by
//! [`Vfs::write_file`] and [`Vfs::delete_file`], and persisted to
//! [`INDEX_PATH`] only when flushed, normally by the task from
//! [`spawn_autosave`]. Anything written after the last flush is lost on a
//! crash.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::VfsResult;
use crate::node::{Content, Meta, Node, is_hidden};
use crate::path::basename;
use crate::permissions::PermissionSet;
use crate::vfs::Vfs;

/// Where the index snapshot is persisted.
pub const INDEX_PATH: &str = "/system/index.json";

/// Shortest query [`FileIndex::search`] answers.
pub const MIN_QUERY_LEN: usize = 2;

/// Denormalized metadata for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Final path segment.
    pub name: String,
    /// Absolute path.
    pub path: String,
    /// Sniffed mimetype.
    pub mimetype: String,
    /// Always `"file"`; directories are not indexed.
    #[serde(rename = "type")]
    pub kind: String,
    /// Node permission tags.
    pub permissions: PermissionSet,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Node metadata.
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl IndexEntry {
    /// Build the entry for a file node. Returns `None` for directories.
    #[must_use]
    pub fn for_node(path: &str, node: &Node) -> Option<Self> {
        let mimetype = node.mimetype()?;
        Some(Self {
            name: basename(path).to_owned(),
            path: path.to_owned(),
            mimetype: mimetype.to_owned(),
            kind: node.kind().to_owned(),
            permissions: node.permissions.clone(),
            created: node.created,
            modified: node.modified,
            meta: node.meta.clone(),
        })
    }

    /// Whether the entry is flagged `hidden`.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        is_hidden(&self.meta)
    }
}

/// In-memory map from path to [`IndexEntry`].
#[derive(Debug, Default)]
pub struct FileIndex {
    entries: RwLock<BTreeMap<String, IndexEntry>>,
}

impl FileIndex {
    /// An empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `entry.path`.
    pub fn upsert(&self, entry: IndexEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.path.clone(), entry);
    }

    /// Drop the entry for `path`. Returns `true` if one existed.
    pub fn remove(&self, path: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }

    /// Entry for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<IndexEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Number of indexed files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, keyed by path.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, IndexEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole map.
    pub fn replace(&self, entries: BTreeMap<String, IndexEntry>) {
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
    }

    /// Case-insensitive substring search over entry names.
    ///
    /// Queries shorter than [`MIN_QUERY_LEN`] characters match nothing.
    /// Hidden entries are skipped. Results are ordered by name, then path.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<IndexEntry> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }

        let mut hits: Vec<IndexEntry> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| !e.is_hidden() && e.name.to_lowercase().contains(&query))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        hits
    }

    /// Load the persisted snapshot from [`INDEX_PATH`], replacing the
    /// in-memory map.
    ///
    /// A missing snapshot leaves the index empty. An unreadable one is
    /// logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying store fails.
    pub async fn load(&self, vfs: &Vfs) -> VfsResult<()> {
        let Some(content) = vfs.get_file(INDEX_PATH, &PermissionSet::user()).await? else {
            debug!(path = INDEX_PATH, "No persisted index, starting empty");
            return Ok(());
        };

        let parsed = match content {
            Content::Json(value) => serde_json::from_value(value),
            Content::Text(text) => serde_json::from_str(&text),
            Content::Binary(bytes) => serde_json::from_slice(&bytes),
        };
        match parsed {
            Ok(entries) => {
                self.replace(entries);
                info!(entries = self.len(), "Loaded file index");
            },
            Err(e) => {
                warn!(path = INDEX_PATH, error = %e, "Ignoring unreadable index snapshot");
            },
        }
        Ok(())
    }

    /// Persist the current map to [`INDEX_PATH`], unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded or stored.
    pub async fn flush(&self, vfs: &Vfs) -> VfsResult<()> {
        let snapshot = serde_json::to_value(self.snapshot())?;
        vfs.write_file(
            INDEX_PATH,
            Content::Json(snapshot),
            &PermissionSet::user(),
            Meta::new(),
        )
        .await?;
        debug!(entries = self.len(), "Flushed file index");
        Ok(())
    }
}

/// Flush `vfs`'s index every `period`, starting immediately.
///
/// Failures are logged and retried on the next tick. Abort the handle to stop.
pub fn spawn_autosave(vfs: Arc<Vfs>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = vfs.index().flush(&vfs).await {
                warn!(error = %e, "Index autosave failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, hidden: bool) -> IndexEntry {
        let mut meta = Meta::new();
        if hidden {
            meta.insert("hidden".into(), serde_json::Value::Bool(true));
        }
        IndexEntry {
            name: basename(path).to_owned(),
            path: path.to_owned(),
            mimetype: "text/plain".into(),
            kind: "file".into(),
            permissions: PermissionSet::user(),
            created: Utc::now(),
            modified: Utc::now(),
            meta,
        }
    }

    #[test]
    fn test_upsert_get_remove() {
        let index = FileIndex::new();
        index.upsert(entry("/home/a.txt", false));
        assert_eq!(index.get("/home/a.txt").unwrap().name, "a.txt");
        assert!(index.remove("/home/a.txt"));
        assert!(!index.remove("/home/a.txt"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_rules() {
        let index = FileIndex::new();
        index.upsert(entry("/home/Notes.txt", false));
        index.upsert(entry("/home/applications/notes.app", false));
        index.upsert(entry("/home/applications/secret-notes.app", true));
        index.upsert(entry("/home/todo.md", false));

        assert!(index.search("n").is_empty());
        let names: Vec<_> = index.search("NOTE").into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Notes.txt", "notes.app"]);
    }

    #[test]
    fn test_entry_serializes_kind_as_type() {
        let json = serde_json::to_value(entry("/x.txt", false)).unwrap();
        assert_eq!(json["type"], "file");
        assert!(json.get("kind").is_none());
    }
}
