//! Key/string storage abstraction.
//!
//! The host platform owns the real secure store; the client core only sees
//! [`KeyStore`]. Every operation may fail independently of network state, and
//! callers are expected to treat a failed read as a miss.

use agrifield_core::ErrorKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StorageFailure
    }
}

/// Async key/string storage.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Value stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Removes every key owned by this store.
    async fn clear_all(&self) -> Result<(), StoreError>;
}

/// Process-local store. Used by tests and by hosts without a secure store.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyStore")
            .field("unavailable", &self.unavailable.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`]
    /// until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store disabled".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    #[instrument(skip(self), fields(store.operation = "GET"))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_available()?;
        let value = self.entries.read().await.get(key).cloned();
        debug!(store.key = %key, hit = value.is_some(), "Store lookup");
        Ok(value)
    }

    #[instrument(skip(self, value), fields(store.operation = "SET"))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    #[instrument(skip(self), fields(store.operation = "DEL"))]
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    #[instrument(skip(self), fields(store.operation = "CLEAR"))]
    async fn clear_all(&self) -> Result<(), StoreError> {
        self.check_available()?;
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryKeyStore::new();
        store.set("punchId", "42").await.unwrap();
        assert_eq!(store.get("punchId").await.unwrap().as_deref(), Some("42"));

        store.remove("punchId").await.unwrap();
        assert_eq!(store.get("punchId").await.unwrap(), None);

        // removing twice is fine
        store.remove("punchId").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = MemoryKeyStore::new();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();
        assert_eq!(store.len().await, 2);

        store.clear_all().await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = MemoryKeyStore::new();
        store.set("a", "1").await.unwrap();
        store.set_unavailable(true);

        let err = store.get("a").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert!(store.set("a", "2").await.is_err());
        assert!(store.remove("a").await.is_err());
        assert!(store.clear_all().await.is_err());

        store.set_unavailable(false);
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    }
}
