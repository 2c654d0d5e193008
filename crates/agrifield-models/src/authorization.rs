//! Permission grants and the authorization snapshot.
//!
//! The permissions endpoint has shipped two grant encodings over time: a bare
//! boolean and an object carrying scope and provenance. Both are accepted as
//! [`RawGrant`] and normalized once into [`Grant`] when a response is ingested,
//! so nothing downstream ever inspects the wire shape again.

use agrifield_core::{Action, Module, Scope, Source};
use serde::de::value::MapAccessDeserializer;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::serde::deserialize_lenient_bool;

// ============ Wire types ============

/// Grant as sent by the server.
///
/// Any non-object value is read as a legacy flag with the same leniency as
/// other server booleans: `null`, `0`, `1` and `"true"` are accepted, and
/// anything unrecognised denies. One odd grant never fails the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawGrant {
    Legacy(bool),
    Enhanced(EnhancedGrant),
}

impl<'de> Deserialize<'de> for RawGrant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawGrantVisitor)
    }
}

struct RawGrantVisitor;

impl<'de> Visitor<'de> for RawGrantVisitor {
    type Value = RawGrant;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean flag or a grant object")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
        Ok(RawGrant::Legacy(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(RawGrant::Legacy(value != 0))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(RawGrant::Legacy(value != 0))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        Ok(RawGrant::Legacy(value != 0.0))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        let value = value.trim();
        Ok(RawGrant::Legacy(
            value.eq_ignore_ascii_case("true") || value == "1",
        ))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawGrant::Legacy(false))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawGrant::Legacy(false))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(RawGrant::Legacy(false))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        EnhancedGrant::deserialize(MapAccessDeserializer::new(map)).map(RawGrant::Enhanced)
    }
}

/// Object-encoded grant. Qualifiers are kept as strings so an unknown scope
/// or source drops that qualifier instead of the whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancedGrant {
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub allowed: bool,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(
        default,
        alias = "ownDataOnly",
        deserialize_with = "deserialize_lenient_bool"
    )]
    pub own_data_only: bool,
}

/// One entry of the `modules` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub module: String,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub enabled: bool,
    #[serde(default)]
    pub permissions: BTreeMap<String, RawGrant>,
}

/// Body of the permissions endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionsResponse {
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
    #[serde(default, alias = "userProfile")]
    pub user_profile: Option<UserProfile>,
}

/// Identity details delivered alongside the permission matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(
        default,
        alias = "isAdmin",
        deserialize_with = "deserialize_lenient_bool"
    )]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, alias = "fullName", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ============ Normalized types ============

/// The decision for one module/action pair.
///
/// Serializes to the enhanced wire shape, so a normalized grant can be fed
/// back through [`RawGrant`] and comes out unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    pub allowed: bool,
    pub scope: Option<Scope>,
    pub source: Option<Source>,
    pub own_data_only: bool,
}

impl Grant {
    pub const DENIED: Grant = Grant {
        allowed: false,
        scope: None,
        source: None,
        own_data_only: false,
    };

    /// Normalization of a legacy boolean grant.
    pub const fn legacy(allowed: bool) -> Self {
        Grant {
            allowed,
            scope: None,
            source: None,
            own_data_only: false,
        }
    }
}

impl From<RawGrant> for Grant {
    fn from(raw: RawGrant) -> Self {
        match raw {
            RawGrant::Legacy(allowed) => Grant::legacy(allowed),
            RawGrant::Enhanced(enhanced) => Grant {
                allowed: enhanced.allowed,
                scope: enhanced.scope.as_deref().and_then(|s| s.parse().ok()),
                source: enhanced.source.as_deref().and_then(|s| s.parse().ok()),
                own_data_only: enhanced.own_data_only,
            },
        }
    }
}

impl From<Grant> for RawGrant {
    fn from(grant: Grant) -> Self {
        RawGrant::Enhanced(EnhancedGrant {
            allowed: grant.allowed,
            scope: grant.scope.map(|s| s.as_str().to_string()),
            source: grant.source.map(|s| s.as_str().to_string()),
            own_data_only: grant.own_data_only,
        })
    }
}

/// Enablement flag and per-action grants of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermissions {
    pub enabled: bool,
    pub grants: BTreeMap<Action, Grant>,
}

impl ModulePermissions {
    /// Disabled module with every action explicitly denied.
    pub fn denied() -> Self {
        Self {
            enabled: false,
            grants: Action::ALL.iter().map(|a| (*a, Grant::DENIED)).collect(),
        }
    }

    /// Grant for `action`, honouring the enabled flag.
    pub fn grant(&self, action: Action) -> Option<Grant> {
        if !self.enabled {
            return None;
        }
        self.grants.get(&action).copied()
    }
}

/// Complete permission state as of one load.
///
/// Snapshots are never edited after construction; a refresh builds a new one
/// and swaps it in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSnapshot {
    pub modules: BTreeMap<Module, ModulePermissions>,
}

impl AuthorizationSnapshot {
    /// Snapshot with no modules at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every known module present, disabled, every action denied.
    pub fn all_denied() -> Self {
        Self {
            modules: Module::ALL
                .iter()
                .map(|m| (*m, ModulePermissions::denied()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module(&self, module: Module) -> Option<&ModulePermissions> {
        self.modules.get(&module)
    }

    /// Grant for the pair, or `None` when the module is absent or disabled.
    pub fn query(&self, module: Module, action: Action) -> Option<Grant> {
        self.modules.get(&module).and_then(|m| m.grant(action))
    }

    pub fn is_module_enabled(&self, module: Module) -> bool {
        self.modules.get(&module).is_some_and(|m| m.enabled)
    }

    pub fn enabled_modules(&self) -> BTreeSet<Module> {
        self.modules
            .iter()
            .filter(|(_, m)| m.enabled)
            .map(|(module, _)| *module)
            .collect()
    }

    /// Actions whose grant is allowed, regardless of scope. Empty for a
    /// disabled or absent module.
    pub fn allowed_actions(&self, module: Module) -> BTreeSet<Action> {
        match self.modules.get(&module) {
            Some(m) if m.enabled => m
                .grants
                .iter()
                .filter(|(_, g)| g.allowed)
                .map(|(action, _)| *action)
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Copy without the disabled modules, which behave exactly like absent ones.
    pub fn enabled_only(&self) -> Self {
        Self {
            modules: self
                .modules
                .iter()
                .filter(|(_, m)| m.enabled)
                .map(|(module, perms)| (*module, perms.clone()))
                .collect(),
        }
    }
}

/// Result of ingesting a permissions response.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub snapshot: AuthorizationSnapshot,
    pub profile: Option<UserProfile>,
    /// Module names the client does not know about.
    pub unknown_modules: Vec<String>,
    /// `module.action` pairs naming an action the client does not know about.
    pub unknown_actions: Vec<String>,
}

impl PermissionsResponse {
    /// Converts the wire payload into a snapshot. Later entries for the same
    /// module replace earlier ones.
    pub fn normalize(self) -> Normalized {
        let mut modules = BTreeMap::new();
        let mut unknown_modules = Vec::new();
        let mut unknown_actions = Vec::new();

        for entry in self.modules {
            let Ok(module) = entry.module.parse::<Module>() else {
                unknown_modules.push(entry.module);
                continue;
            };

            let mut grants = BTreeMap::new();
            for (name, raw) in entry.permissions {
                match name.parse::<Action>() {
                    Ok(action) => {
                        grants.insert(action, Grant::from(raw));
                    }
                    Err(_) => unknown_actions.push(format!("{}.{}", module, name)),
                }
            }

            modules.insert(
                module,
                ModulePermissions {
                    enabled: entry.enabled,
                    grants,
                },
            );
        }

        Normalized {
            snapshot: AuthorizationSnapshot { modules },
            profile: self.user_profile,
            unknown_modules,
            unknown_actions,
        }
    }
}

impl From<&AuthorizationSnapshot> for PermissionsResponse {
    /// Re-encodes a snapshot in the enhanced wire shape.
    fn from(snapshot: &AuthorizationSnapshot) -> Self {
        Self {
            modules: snapshot
                .modules
                .iter()
                .map(|(module, perms)| ModuleEntry {
                    module: module.as_str().to_string(),
                    enabled: perms.enabled,
                    permissions: perms
                        .grants
                        .iter()
                        .map(|(action, grant)| (action.as_str().to_string(), (*grant).into()))
                        .collect(),
                })
                .collect(),
            user_profile: None,
        }
    }
}
