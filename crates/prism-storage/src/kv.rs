//! Raw key-value store trait and the in-memory implementation.
//!
//! The [`KvStore`] trait is the whole persistence contract the VFS relies
//! on: byte-level `get`/`set`/`delete` by key, plus a full key listing.
//! Keys are opaque to the store; the VFS uses absolute paths such as
//! `/home/applications/notes.app`.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a key is safe for storage.
///
/// Keys must be non-empty and must not contain the null byte.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Raw key-value store trait.
///
/// Every operation is independent; callers that need read-modify-write
/// atomicity must provide their own sequencing.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value by key.
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Set a value for a key, overwriting any existing value.
    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Delete a key.
    ///
    /// Returns `true` if the key existed and was deleted.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// List every key in the store.
    async fn list_keys(&self) -> StorageResult<Vec<String>>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory key-value store for tests and ephemeral data.
///
/// Keys are kept in a `BTreeMap`, so [`KvStore::list_keys`] is sorted.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: std::sync::RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    /// Create a new empty in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn len(&self) -> StorageResult<usize> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.len())
    }

    /// Whether the store holds no keys.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        data.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.contains_key(key))
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(data.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_get_set() {
        let store = MemoryKvStore::new();
        store.set("/a", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get("/a").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_get_missing() {
        let store = MemoryKvStore::new();
        assert!(store.get("/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_overwrite() {
        let store = MemoryKvStore::new();
        store.set("/k", b"v1".to_vec()).await.unwrap();
        store.set("/k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("/k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_memory_delete() {
        let store = MemoryKvStore::new();
        store.set("/k", b"v".to_vec()).await.unwrap();
        assert!(store.delete("/k").await.unwrap());
        assert!(!store.delete("/k").await.unwrap());
        assert!(!store.exists("/k").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_list_keys_sorted() {
        let store = MemoryKvStore::new();
        store.set("/b", b"2".to_vec()).await.unwrap();
        store.set("/a", b"1".to_vec()).await.unwrap();
        store.set("/a/c", b"3".to_vec()).await.unwrap();
        assert_eq!(store.list_keys().await.unwrap(), vec!["/a", "/a/c", "/b"]);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_validate_key_rejects_empty() {
        assert!(validate_key("").is_err());
    }

    #[test]
    fn test_validate_key_rejects_null_byte() {
        assert!(validate_key("/k\0bad").is_err());
    }

    #[tokio::test]
    async fn test_memory_rejects_invalid_key() {
        let store = MemoryKvStore::new();
        assert!(store.set("", b"v".to_vec()).await.is_err());
        assert!(store.is_empty().unwrap());
    }
}
