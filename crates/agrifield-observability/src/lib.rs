//! Agrifield Observability
//!
//! Provides:
//! - Console logging through `tracing-subscriber`, compact or JSON
//! - Counters for permission loads, attendance syncs and punches via the
//!   `metrics` facade
//!
//! No metrics recorder is installed here; the host decides where counters go.
//! Without a recorder every counter is a no-op.
//!
//! # Examples
//!
//! ```no_run
//! use agrifield_observability::init_tracing;
//!
//! init_tracing();
//! tracing::info!("client started");
//! ```

pub mod logging;
pub mod metrics;

pub use self::logging::{LogFormat, init_tracing};
pub use self::metrics::{track_attendance_sync, track_permission_fetch, track_punch};
