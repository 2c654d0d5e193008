use agrifield_core::{ApiError, ErrorKind};
use agrifield_models::{AttendanceState, DailyStatus, PunchPhase};

use crate::services::{DeviceRestriction, LocationError};

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub state: AttendanceState,
    pub phase: PunchPhase,
    /// Server-reported name, or the cached one when the server was unreachable.
    pub display_name: Option<String>,
    /// Full dashboard payload when the server answered.
    pub status: Option<DailyStatus>,
    /// Whether this report reflects a server response.
    pub online: bool,
}

/// Non-error results of a punch request.
#[derive(Debug, Clone, PartialEq)]
pub enum PunchOutcome {
    /// Server acknowledged the punch; carries the follow-up sync.
    Completed(SyncReport),
    /// Another punch request is still running. Nothing was done.
    Busy,
    /// The current phase does not allow this transition.
    NotAllowed(PunchPhase),
    /// Device check failed before the prompt.
    DeviceRestricted(DeviceRestriction),
    /// User dismissed the confirmation.
    Declined,
    /// Server unreachable; nothing was committed.
    Deferred,
    /// Punch-out answered 401. Logged and otherwise ignored.
    Ignored,
    /// The session was reset while the request ran. The server may have
    /// recorded the punch; nothing was stored locally.
    SessionEnded,
}

impl PunchOutcome {
    /// Whether the host must reset the gesture (slider, button) that
    /// started the request.
    pub fn resets_gesture(&self) -> bool {
        !matches!(self, PunchOutcome::Completed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PunchOutcome::Completed(_) => "ok",
            PunchOutcome::Busy => "busy",
            PunchOutcome::NotAllowed(_) => "not_allowed",
            PunchOutcome::DeviceRestricted(_) => "device_restricted",
            PunchOutcome::Declined => "declined",
            PunchOutcome::Deferred => "deferred",
            PunchOutcome::Ignored => "ignored",
            PunchOutcome::SessionEnded => "session_ended",
        }
    }
}

/// User-visible punch failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PunchError {
    /// Business rule refusal, e.g. one punch per day.
    #[error("{message}")]
    Restricted { message: String },

    /// The attendance endpoint does not exist. Retrying will not help.
    #[error("attendance service is not configured on the server")]
    NotFound,

    #[error("session is no longer authorized")]
    Unauthorized,

    #[error("could not determine location: {0}")]
    Location(#[from] LocationError),

    #[error("no active punch id is known")]
    MissingPunchId,

    #[error("punch request failed: {0}")]
    Failed(ApiError),
}

impl PunchError {
    /// Taxonomy entry for server-side failures; `None` for local ones.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PunchError::Restricted { .. } => Some(ErrorKind::ServerRejected),
            PunchError::NotFound => Some(ErrorKind::NotFound),
            PunchError::Unauthorized => Some(ErrorKind::Unauthorized),
            PunchError::Failed(e) => Some(e.kind()),
            PunchError::Location(_) | PunchError::MissingPunchId => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PunchError::Restricted { .. } => "restricted",
            PunchError::NotFound => "not_found",
            PunchError::Unauthorized => "unauthorized",
            PunchError::Location(_) => "location",
            PunchError::MissingPunchId => "missing_punch_id",
            PunchError::Failed(_) => "failed",
        }
    }
}
