pub mod context;
pub mod model;
pub mod service;

pub use context::AuthorizationContext;
pub use model::{AuthorizationError, FetchOutcome, Feature, LoadState, SnapshotSource};
pub use service::{AuthorizationCache, CachedAuthorization};
