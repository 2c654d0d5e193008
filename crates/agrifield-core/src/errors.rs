//! Transport errors and the failure taxonomy.
//!
//! Every failure that crosses the network boundary is an [`ApiError`]. Callers
//! never branch on status codes directly; they ask for the [`ErrorKind`] and
//! decide between propagating, degrading to cached data, or alerting the user.

use serde::Serialize;
use std::fmt;

/// Classification of a failure, independent of where it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Session is no longer valid. Must reach the host so it can force a logout.
    Unauthorized,
    /// No response at all, including timeouts.
    NetworkUnreachable,
    /// A 4xx business rule refusal, e.g. a second punch on the same day.
    ServerRejected,
    /// The target endpoint or record does not exist.
    NotFound,
    /// 5xx or a response the client could not understand.
    ServerError,
    /// Persistence I/O failed. Treated as a cache miss.
    StorageFailure,
}

impl ErrorKind {
    /// Whether a failure of this kind should stay out of the user's way.
    pub fn is_silent(&self) -> bool {
        matches!(self, ErrorKind::NetworkUnreachable | ErrorKind::StorageFailure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NetworkUnreachable => "network_unreachable",
            ErrorKind::ServerRejected => "server_rejected",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ServerError => "server_error",
            ErrorKind::StorageFailure => "storage_failure",
        };
        f.write_str(name)
    }
}

/// Error returned by an API client call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("network unreachable: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status<M: Into<String>>(status: u16, message: M) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::status(401, "Unauthorized")
    }

    pub fn not_found<M: Into<String>>(message: M) -> Self {
        Self::status(404, message)
    }

    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::Network(message.into())
    }

    /// Maps the error onto the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Status { status: 401, .. } => ErrorKind::Unauthorized,
            ApiError::Status { status: 404, .. } => ErrorKind::NotFound,
            ApiError::Status { status, .. } if (400..500).contains(status) => {
                ErrorKind::ServerRejected
            }
            ApiError::Status { .. } => ErrorKind::ServerError,
            ApiError::Network(_) => ErrorKind::NetworkUnreachable,
            ApiError::Decode(_) => ErrorKind::ServerError,
        }
    }

    /// Server-provided message, when there was a response.
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => Some(message),
            _ => None,
        }
    }
}
