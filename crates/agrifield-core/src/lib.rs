//! # Agrifield Core
//!
//! Core types and errors shared by every Agrifield client crate.
//!
//! - [`permissions`]: the fixed module/action vocabulary and grant scopes
//! - [`errors`]: transport errors and the failure taxonomy used for fallback decisions
//!
//! # Example
//!
//! ```ignore
//! use agrifield_core::{Action, ErrorKind, Module};
//!
//! let module: Module = "FARMER".parse()?;
//! assert_eq!(module, Module::Farmer);
//! assert_eq!(Action::Approve.as_str(), "approve");
//! ```

pub mod errors;
pub mod permissions;

// Re-export commonly used types at crate root
pub use errors::{ApiError, ErrorKind};
pub use permissions::{Action, Module, Scope, Source, UnknownVariant};
