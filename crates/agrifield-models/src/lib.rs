//! # Agrifield Models
//!
//! Domain models and DTOs for the Agrifield client.
//!
//! # Modules
//!
//! - [`authorization`]: permission grants, snapshots and the permissions endpoint payload
//! - [`attendance`]: daily status, punch requests and the reconciled attendance state
//! - [`ids`]: strongly-typed identifiers
//! - [`serde`]: lenient deserializers for server fields that change type
//!
//! # Example
//!
//! ```ignore
//! use agrifield_models::authorization::{AuthorizationSnapshot, PermissionsResponse};
//!
//! let response: PermissionsResponse = serde_json::from_str(body)?;
//! let normalized = response.normalize();
//! let can_read = normalized.snapshot.query(Module::Farmer, Action::Read);
//! ```

pub mod attendance;
pub mod authorization;
pub mod ids;
pub mod serde;

// Re-export commonly used types at crate root for convenience
pub use attendance::{
    AttendanceState, Coordinates, DailyStatus, PunchInResponse, PunchPhase, PunchStatus,
    RecentVisit, VisitSummary, WorkingHours,
};
pub use authorization::{
    AuthorizationSnapshot, EnhancedGrant, Grant, ModuleEntry, ModulePermissions, Normalized,
    PermissionsResponse, RawGrant, UserProfile,
};
pub use ids::PunchId;
