pub mod model;
pub mod service;

pub use model::{PunchError, PunchOutcome, SyncReport};
pub use service::SessionReconciler;
