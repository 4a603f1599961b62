//! Directory-backed key-value store.
//!
//! Each key lives in its own file under the store root. The file name is the
//! hex-encoded SHA-256 of the key, which keeps names short and free of path
//! separators no matter how deep the VFS path is. The file itself carries the
//! original key so [`KvStore::list_keys`] can recover it:
//!
//! ```text
//! [u32 BE key length][key bytes][value bytes]
//! ```
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a
//! reader never observes a half-written value.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::kv::{KvStore, validate_key};

/// Suffix of in-flight writes.
const TMP_SUFFIX: &str = ".tmp";

/// Size of the key-length header.
const HEADER_LEN: usize = 4;

/// Persistent key-value store rooted at a host directory.
#[derive(Debug, Clone)]
pub struct DirKvStore {
    root: PathBuf,
}

impl DirKvStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the directory cannot be created.
    pub async fn open(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::Connection(format!("{}: {e}", root.display())))?;
        debug!(root = %root.display(), "Opened directory store");
        Ok(Self { root })
    }

    /// The directory this store writes into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(hex::encode(digest))
    }

    fn encode(key: &str, value: &[u8]) -> StorageResult<Vec<u8>> {
        let key_len = u32::try_from(key.len())
            .map_err(|_| StorageError::InvalidKey("key is too long".into()))?;
        let mut buf = Vec::with_capacity(HEADER_LEN.saturating_add(key.len()).saturating_add(value.len()));
        buf.extend_from_slice(&key_len.to_be_bytes());
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(value);
        Ok(buf)
    }

    /// Split a stored file into `(key, value)`.
    fn decode(raw: &[u8]) -> StorageResult<(&str, &[u8])> {
        let corrupt = || StorageError::Internal("corrupt store entry".into());
        let header: [u8; HEADER_LEN] = raw
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(corrupt)?;
        let key_len = usize::try_from(u32::from_be_bytes(header)).map_err(|_| corrupt())?;
        let key_end = HEADER_LEN.checked_add(key_len).ok_or_else(corrupt)?;
        let key_bytes = raw.get(HEADER_LEN..key_end).ok_or_else(corrupt)?;
        let key = std::str::from_utf8(key_bytes).map_err(|_| corrupt())?;
        let value = raw.get(key_end..).ok_or_else(corrupt)?;
        Ok((key, value))
    }

    async fn read_raw(path: &Path) -> StorageResult<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[async_trait]
impl KvStore for DirKvStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let Some(raw) = Self::read_raw(&self.file_for(key)).await? else {
            return Ok(None);
        };
        let (stored_key, value) = Self::decode(&raw)?;
        if stored_key != key {
            return Err(StorageError::Internal(format!(
                "digest collision between '{stored_key}' and '{key}'"
            )));
        }
        Ok(Some(value.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        let target = self.file_for(key);
        let mut tmp = target.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, Self::encode(key, &value)?).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.file_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(tokio::fs::try_exists(self.file_for(key)).await?)
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(TMP_SUFFIX) {
                continue;
            }
            let Some(raw) = Self::read_raw(&entry.path()).await? else {
                continue;
            };
            match Self::decode(&raw) {
                Ok((key, _)) => keys.push(key.to_owned()),
                Err(e) => {
                    warn!(file = %entry.path().display(), error = %e, "Skipping unreadable store entry");
                },
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_store() -> (DirKvStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = DirKvStore::open(dir.path().join("kv")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_dir_get_set() {
        let (store, _dir) = make_store().await;
        store.set("/system/index.json", b"{}".to_vec()).await.unwrap();
        assert_eq!(
            store.get("/system/index.json").await.unwrap(),
            Some(b"{}".to_vec())
        );
    }

    #[tokio::test]
    async fn test_dir_get_missing() {
        let (store, _dir) = make_store().await;
        assert!(store.get("/nope").await.unwrap().is_none());
        assert!(!store.exists("/nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_dir_overwrite_and_delete() {
        let (store, _dir) = make_store().await;
        store.set("/k", b"v1".to_vec()).await.unwrap();
        store.set("/k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("/k").await.unwrap(), Some(b"v2".to_vec()));
        assert!(store.delete("/k").await.unwrap());
        assert!(!store.delete("/k").await.unwrap());
    }

    #[tokio::test]
    async fn test_dir_list_keys_recovers_original_keys() {
        let (store, _dir) = make_store().await;
        store.set("/home", Vec::new()).await.unwrap();
        store.set("/", b"root".to_vec()).await.unwrap();
        let deep = format!("/{}", "nested/".repeat(60));
        store.set(&deep, b"deep".to_vec()).await.unwrap();

        let keys = store.list_keys().await.unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], "/");
        assert!(keys.contains(&deep));
    }

    #[tokio::test]
    async fn test_dir_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DirKvStore::open(dir.path()).await.unwrap();
            store.set("/persist", b"yes".to_vec()).await.unwrap();
        }
        let store = DirKvStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get("/persist").await.unwrap(), Some(b"yes".to_vec()));
    }

    #[test]
    fn test_decode_rejects_truncated_entry() {
        assert!(DirKvStore::decode(&[0, 0]).is_err());
        assert!(DirKvStore::decode(&[0, 0, 0, 9, b'a']).is_err());
    }
}
