//! File-backed key store.
//!
//! Each key lives in its own file under a base directory. File names are the
//! SHA-256 of `namespace:key`, so arbitrary key strings map to safe names and
//! two namespaces sharing a directory never collide. Writes go through a
//! uniquely named temporary file and a rename so a crash never leaves a
//! half-written value. Index updates are serialized per handle; clones share
//! the lock.
//!
//! # Example
//!
//! ```ignore
//! use agrifield_cache::{FileKeyStore, KeyStore};
//! use std::path::PathBuf;
//!
//! let store = FileKeyStore::new(PathBuf::from(".agrifield"), "agrifield");
//! store.set("punchId", "42").await?;
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::store::{KeyStore, StoreError};

const ENTRY_EXTENSION: &str = "entry";

/// Stores each key as a file in `base_dir`.
#[derive(Clone, Debug)]
pub struct FileKeyStore {
    /// Directory holding the entry files
    base_dir: PathBuf,

    /// Mixed into file names; `clear_all` only removes this namespace's keys
    namespace: String,

    /// Held across every read-modify-write of the index
    index_lock: Arc<Mutex<()>>,
}

impl FileKeyStore {
    /// Create a store rooted at `base_dir`. The directory is created lazily on
    /// first write.
    pub fn new(base_dir: PathBuf, namespace: impl Into<String>) -> Self {
        Self {
            base_dir,
            namespace: namespace.into(),
            index_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn digest(&self, key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.namespace.as_bytes());
        hasher.update(b":");
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", self.digest(key), ENTRY_EXTENSION))
    }

    /// Index file listing this namespace's keys so `clear_all` leaves other
    /// namespaces alone.
    fn index_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.index", self.digest("")))
    }

    async fn read_index(&self) -> Result<Vec<String>, StoreError> {
        match fs::read_to_string(self.index_path()).await {
            Ok(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable key index");
                Vec::new()
            })),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_index(&self, keys: &[String]) -> Result<(), StoreError> {
        let json = serde_json::to_string(keys)?;
        self.write_atomic(&self.index_path(), &json).await
    }

    async fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir).await?;
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove_file(path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    #[instrument(skip(self), fields(store.operation = "GET"))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.entry_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                debug!(store.key = %key, "Store miss");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, value), fields(store.operation = "SET"))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write_atomic(&self.entry_path(key), value).await?;

        let _index = self.index_lock.lock().await;
        let mut keys = self.read_index().await?;
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
            self.write_index(&keys).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(store.operation = "DEL"))]
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        Self::remove_file(&self.entry_path(key)).await?;

        let _index = self.index_lock.lock().await;
        let mut keys = self.read_index().await?;
        let before = keys.len();
        keys.retain(|k| k != key);
        if keys.len() != before {
            self.write_index(&keys).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(store.operation = "CLEAR"))]
    async fn clear_all(&self) -> Result<(), StoreError> {
        let _index = self.index_lock.lock().await;
        let keys = self.read_index().await?;
        for key in &keys {
            Self::remove_file(&self.entry_path(key)).await?;
        }
        Self::remove_file(&self.index_path()).await?;
        debug!(store.cleared = keys.len(), "Namespace cleared");
        Ok(())
    }
}
