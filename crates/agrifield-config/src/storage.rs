//! On-device store configuration.
//!
//! - `AGRIFIELD_STORE_DIR`: Directory for the file-backed store (default: `.agrifield`)
//! - `AGRIFIELD_STORE_NAMESPACE`: Key namespace (default: `agrifield`)

use std::path::PathBuf;

use crate::env_string;

pub const DEFAULT_STORE_DIR: &str = ".agrifield";
pub const DEFAULT_NAMESPACE: &str = "agrifield";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STORE_DIR),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_string)
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            dir: lookup("AGRIFIELD_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dir),
            namespace: lookup("AGRIFIELD_STORE_NAMESPACE").unwrap_or(defaults.namespace),
        }
    }
}
