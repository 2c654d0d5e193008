//! Permission vocabulary for the Agrifield client.
//!
//! Modules and actions form a fixed set known at compile time. Each variant
//! carries two spellings: the wire name the permissions endpoint uses and a
//! short code used by the compressed on-device snapshot.
//!
//! # Example
//!
//! ```ignore
//! use agrifield_core::permissions::{Action, Module};
//!
//! let module: Module = "inventory".parse()?;
//! assert_eq!(module.as_str(), "INVENTORY");
//! assert_eq!(Module::from_code(module.code()), Some(module));
//! assert_eq!(Action::ALL.len(), 10);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// Returned when a wire name does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Defines a closed enumeration with a wire name and a compact storage code
/// per variant.
macro_rules! define_vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => ($wire:literal, $code:literal)
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Name used on the wire.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            /// Short code used in compressed storage.
            pub const fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Reverse of [`Self::code`].
            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

// =============================================================================
// Modules
// =============================================================================

define_vocabulary! {
    /// A functional area subject to independent enable/disable and grants.
    Module {
        /// Punch in/out and working hours
        Attendance => ("ATTENDANCE", "at"),
        /// Farmer records
        Farmer => ("FARMER", "fa"),
        /// Dealer records
        Dealer => ("DEALER", "de"),
        /// Field visits to farmers and dealers
        Visit => ("VISIT", "vi"),
        /// Stock held by the field team
        Inventory => ("INVENTORY", "in"),
        /// Orders placed on behalf of dealers
        SalesOrder => ("SALES_ORDER", "so"),
        /// Collections against orders
        Payment => ("PAYMENT", "pa"),
        /// Travel and field expenses
        Expense => ("EXPENSE", "ex"),
        /// Dashboards and exports
        Report => ("REPORT", "re"),
    }
}

// =============================================================================
// Actions
// =============================================================================

define_vocabulary! {
    /// An operation that may be granted on a module.
    Action {
        Create => ("create", "c"),
        Read => ("read", "r"),
        Update => ("update", "u"),
        Delete => ("delete", "d"),
        Submit => ("submit", "s"),
        Approve => ("approve", "a"),
        Reject => ("reject", "j"),
        Cancel => ("cancel", "x"),
        Revise => ("revise", "v"),
        Reconcile => ("reconcile", "k"),
    }
}

// =============================================================================
// Grant qualifiers
// =============================================================================

define_vocabulary! {
    /// Breadth of data an allowed action may touch.
    Scope {
        Own => ("own", "o"),
        Team => ("team", "t"),
        Company => ("company", "c"),
    }
}

define_vocabulary! {
    /// Where the server derived a grant from.
    Source {
        /// Inherited from the user's role
        Role => ("role", "r"),
        /// Set directly on the user
        Override => ("override", "o"),
        /// Platform default for the module
        Default => ("default", "d"),
    }
}
