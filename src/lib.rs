//! # Agrifield Client Core
//!
//! Authorization cache and attendance reconciliation for the Agrifield field
//! staff client.
//!
//! ## Overview
//!
//! - **Authorization**: fetches the per-module/per-action permission matrix,
//!   persists a compressed copy, and answers permission queries. Falls back
//!   to the last persisted snapshot, then to an all-denied default, when the
//!   server is unavailable.
//! - **Attendance**: reconciles the local punch state with the server on every
//!   activation, mirrors the active punch id to storage, and guards punch
//!   transitions against double submission.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── api/              # ApiClient seam and reqwest transport
//! ├── modules/
//! │   ├── authorization/   # AuthorizationCache, AuthorizationContext
//! │   └── attendance/      # SessionReconciler
//! ├── services.rs       # Location, device guard and prompt seams
//! └── state.rs          # ClientState handle
//! ```
//!
//! ## Failure handling
//!
//! | Kind | Behaviour |
//! |------|-----------|
//! | Unauthorized | Propagates; the host signs the user out |
//! | NetworkUnreachable | Degrades to cached state, no alert |
//! | ServerRejected | Shown to the user (e.g. one punch per day) |
//! | NotFound | Shown as a configuration problem, not retried |
//! | StorageFailure | Logged, treated as a cache miss |
//!
//! ## Example
//!
//! ```ignore
//! use agrifield::{ClientState, Collaborators};
//! use agrifield_core::{Action, Module};
//!
//! let state = ClientState::with_http(ApiConfig::from_env(), store, services)?;
//! state.authorization.load().await?;
//! if state.authorization.has_permission(Module::Farmer, Action::Create) {
//!     // show onboarding
//! }
//! state.attendance.restore().await;
//! let report = state.attendance.sync().await;
//! ```

pub mod api;
pub mod modules;
pub mod services;
pub mod state;

pub use state::{ClientState, Collaborators};

// Re-export workspace crates for convenience
pub use agrifield_cache;
pub use agrifield_config;
pub use agrifield_core;
pub use agrifield_models;
