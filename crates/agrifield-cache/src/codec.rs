//! Compressed on-device permission snapshot.
//!
//! Only enabled modules are written, and every module, action and qualifier is
//! replaced with its short code. Disabled and absent modules are
//! indistinguishable to queries, so dropping them loses nothing.
//!
//! ```text
//! {"v":1,"m":{"fa":{"c":{"a":1},"r":{"a":1,"s":"t","o":"r"}}},"p":{...}}
//! ```
//!
//! A snapshot that fails to decode (unknown version, unknown code, bad JSON)
//! is reported as a [`CodecError`]; callers treat that as a cache miss.

use agrifield_core::{Action, Module, Scope, Source};
use agrifield_models::{AuthorizationSnapshot, Grant, ModulePermissions, UserProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const FORMAT_VERSION: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {0}")]
    Version(u8),

    #[error("Unknown {kind} code '{code}'")]
    UnknownCode { kind: &'static str, code: String },
}

/// Serialized form of a snapshot and the profile that came with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedSnapshot {
    #[serde(rename = "v")]
    pub version: u8,

    #[serde(rename = "m", default)]
    pub modules: BTreeMap<String, BTreeMap<String, CompactGrant>>,

    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

/// Grant with single-letter field names. False flags and missing
/// qualifiers are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactGrant {
    #[serde(default, skip_serializing_if = "is_false", with = "flag")]
    pub a: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub o: Option<String>,
    #[serde(default, skip_serializing_if = "is_false", with = "flag")]
    pub w: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Flags are written as `1` to save a few bytes per grant.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}

/// Snapshot and profile restored from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedAuthorization {
    pub snapshot: AuthorizationSnapshot,
    pub profile: Option<UserProfile>,
}

impl From<Grant> for CompactGrant {
    fn from(grant: Grant) -> Self {
        Self {
            a: grant.allowed,
            s: grant.scope.map(|s| s.code().to_string()),
            o: grant.source.map(|s| s.code().to_string()),
            w: grant.own_data_only,
        }
    }
}

impl TryFrom<&CompactGrant> for Grant {
    type Error = CodecError;

    fn try_from(compact: &CompactGrant) -> Result<Self, Self::Error> {
        Ok(Grant {
            allowed: compact.a,
            scope: compact
                .s
                .as_deref()
                .map(|code| lookup(code, "scope", Scope::from_code))
                .transpose()?,
            source: compact
                .o
                .as_deref()
                .map(|code| lookup(code, "source", Source::from_code))
                .transpose()?,
            own_data_only: compact.w,
        })
    }
}

fn lookup<T>(
    code: &str,
    kind: &'static str,
    from_code: impl Fn(&str) -> Option<T>,
) -> Result<T, CodecError> {
    from_code(code).ok_or_else(|| CodecError::UnknownCode {
        kind,
        code: code.to_string(),
    })
}

/// Builds the compressed form. Disabled modules are left out.
pub fn compress(snapshot: &AuthorizationSnapshot, profile: Option<&UserProfile>) -> CompressedSnapshot {
    let modules = snapshot
        .modules
        .iter()
        .filter(|(_, perms)| perms.enabled)
        .map(|(module, perms)| {
            let grants = perms
                .grants
                .iter()
                .map(|(action, grant)| (action.code().to_string(), CompactGrant::from(*grant)))
                .collect();
            (module.code().to_string(), grants)
        })
        .collect();

    CompressedSnapshot {
        version: FORMAT_VERSION,
        modules,
        profile: profile.cloned(),
    }
}

/// Restores a snapshot. Every module present in the compressed form is
/// enabled.
pub fn decompress(compressed: &CompressedSnapshot) -> Result<PersistedAuthorization, CodecError> {
    if compressed.version != FORMAT_VERSION {
        return Err(CodecError::Version(compressed.version));
    }

    let mut modules = BTreeMap::new();
    for (module_code, grants) in &compressed.modules {
        let module = lookup(module_code, "module", Module::from_code)?;
        let mut decoded = BTreeMap::new();
        for (action_code, grant) in grants {
            let action = lookup(action_code, "action", Action::from_code)?;
            decoded.insert(action, Grant::try_from(grant)?);
        }
        modules.insert(
            module,
            ModulePermissions {
                enabled: true,
                grants: decoded,
            },
        );
    }

    Ok(PersistedAuthorization {
        snapshot: AuthorizationSnapshot { modules },
        profile: compressed.profile.clone(),
    })
}

/// Compresses and serializes in one step.
pub fn encode(
    snapshot: &AuthorizationSnapshot,
    profile: Option<&UserProfile>,
) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&compress(snapshot, profile))?)
}

/// Parses and decompresses in one step.
pub fn decode(raw: &str) -> Result<PersistedAuthorization, CodecError> {
    let compressed: CompressedSnapshot = serde_json::from_str(raw)?;
    decompress(&compressed)
}
