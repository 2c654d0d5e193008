//! Strongly-typed identifiers.
//!
//! Server identifiers arrive as either JSON numbers or strings; they are kept
//! as their canonical decimal string so they can be stored and substituted
//! into request paths without conversion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a punch record, issued by the server on punch-in.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PunchId(String);

impl PunchId {
    /// Wraps a raw identifier. Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for PunchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PunchId({})", self.0)
    }
}

impl fmt::Display for PunchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PunchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PunchId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        crate::serde::deserialize_optional_id(deserializer)?
            .map(PunchId)
            .ok_or_else(|| serde::de::Error::custom("punch id must not be empty"))
    }
}
