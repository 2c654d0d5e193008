pub mod attendance;
pub mod authorization;

pub use self::attendance::SessionReconciler;
pub use self::authorization::{AuthorizationCache, AuthorizationContext};
