//! # Agrifield Cache
//!
//! On-device persistence for the Agrifield client.
//!
//! This crate provides:
//! - The [`KeyStore`] abstraction over secure async key/string storage
//! - An in-memory store and a file-backed store
//! - Stable storage key names shared by every component
//! - The compressed permission snapshot codec
//!
//! # Example
//!
//! ```ignore
//! use agrifield_cache::{KeyStore, MemoryKeyStore, keys};
//!
//! let store = MemoryKeyStore::new();
//! store.set(keys::PUNCH_ID, "42").await?;
//! assert_eq!(store.get(keys::PUNCH_ID).await?.as_deref(), Some("42"));
//!
//! let encoded = agrifield_cache::codec::encode(&snapshot, profile.as_ref())?;
//! store.set(keys::PERMISSIONS_SNAPSHOT, &encoded).await?;
//! ```

pub mod codec;
pub mod file;
pub mod keys;
pub mod store;

pub use codec::{CodecError, CompressedSnapshot, PersistedAuthorization};
pub use file::FileKeyStore;
pub use store::{KeyStore, MemoryKeyStore, StoreError};
