//! Storage key names.
//!
//! These names are shared with other components on the device and must not
//! change.

/// Server id of the active punch, mirrored on every reconciliation.
pub const PUNCH_ID: &str = "punchId";

/// Bearer token read by the HTTP transport.
pub const AUTH_TOKEN: &str = "authToken";

/// Compressed permission snapshot plus profile.
pub const PERMISSIONS_SNAPSHOT: &str = "permissionsCache";

/// Last display name reported by the daily status endpoint.
pub const USER_NAME: &str = "userName";

/// Every key removed on logout.
pub const SESSION_KEYS: &[&str] = &[AUTH_TOKEN, PERMISSIONS_SNAPSHOT, PUNCH_ID, USER_NAME];
