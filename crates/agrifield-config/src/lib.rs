//! # Agrifield Config
//!
//! Configuration types for the Agrifield client.
//!
//! This crate provides configuration structures loaded from environment variables:
//!
//! - [`api`]: Server base URL, request timeout and endpoint paths
//! - [`storage`]: Location and namespace of the on-device key store
//!
//! # Example
//!
//! ```ignore
//! use agrifield_config::{ApiConfig, StorageConfig};
//!
//! let api = ApiConfig::from_env();
//! let storage = StorageConfig::from_env();
//! println!("{}", api.url(&api.permissions_path));
//! ```

pub mod api;
pub mod storage;

pub use api::ApiConfig;
pub use storage::StorageConfig;

/// Reads `name`, treating an unset or blank variable as absent.
pub(crate) fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
