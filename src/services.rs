//! Host-provided services the attendance flow depends on.
//!
//! Location, device checks and confirmation prompts belong to the host
//! platform. The client core only sees these traits.

use agrifield_models::Coordinates;
use async_trait::async_trait;
use std::fmt;

/// Direction of a punch transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunchKind {
    In,
    Out,
}

impl PunchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchKind::In => "in",
            PunchKind::Out => "out",
        }
    }
}

impl fmt::Display for PunchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device condition that blocks punching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceRestriction {
    #[error("developer mode is enabled on this device")]
    DeveloperMode,

    #[error("location services are disabled")]
    LocationServicesDisabled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<Coordinates, LocationError>;
}

#[async_trait]
pub trait DeviceGuard: Send + Sync {
    /// First restriction found, or `None` when punching is allowed.
    async fn check(&self) -> Option<DeviceRestriction>;
}

#[async_trait]
pub trait PunchPrompt: Send + Sync {
    /// Asks the user to confirm. `false` means dismissed.
    async fn confirm(&self, kind: PunchKind) -> bool;
}

/// Location fixed at construction, e.g. from command-line flags.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Option<Coordinates>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<Coordinates, LocationError> {
        self.0
            .ok_or_else(|| LocationError::Unavailable("no coordinates configured".into()))
    }
}

/// Guard for hosts that cannot inspect the device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRestrictions;

#[async_trait]
impl DeviceGuard for NoRestrictions {
    async fn check(&self) -> Option<DeviceRestriction> {
        None
    }
}

/// Prompt that accepts every punch without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl PunchPrompt for AutoConfirm {
    async fn confirm(&self, _kind: PunchKind) -> bool {
        true
    }
}
