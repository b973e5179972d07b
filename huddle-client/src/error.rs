use huddle_core::RoomCode;
use thiserror::Error;

/// Failure talking to the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay rejected request: {0}")]
    Rejected(String),

    #[error("relay unavailable: {0}")]
    Unavailable(String),
}

impl RelayError {
    /// Transient errors are retried on the next poll tick; rejections are not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, RelayError::Rejected(_))
    }
}

/// Local audio capture could not be obtained.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PermissionError {
    #[error("microphone access denied: {0}")]
    Denied(String),

    #[error("no audio capture device available")]
    NoDevice,
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("cannot start call: {0}")]
    PermissionDenied(#[from] PermissionError),

    #[error("a call is already active in room {0}")]
    AlreadyActive(RoomCode),

    #[error("no active call in room {0}")]
    NotActive(RoomCode),

    #[error("not in room {0}")]
    NotInRoom(RoomCode),

    #[error("session for room {0} has stopped")]
    SessionClosed(RoomCode),

    #[error(transparent)]
    Relay(#[from] RelayError),
}
