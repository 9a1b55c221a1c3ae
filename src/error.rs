//! Error taxonomy for the Wisp server, split by layer the same way
//! `NooshdarooError` covers its own layers: one variant per failure
//! class, `#[from] std::io::Error` where I/O is the root cause.

use thiserror::Error;

/// Failures connecting to an upstream target on CONNECT.
///
/// The dispatcher classifies each variant into a CLOSE reason code.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connection refused")]
    Refused,
    #[error("connection timed out")]
    Timeout,
    #[error("host unreachable: {0}")]
    Unreachable(String),
    #[error("connect failed: {0}")]
    Other(#[from] std::io::Error),
}

impl ConnectError {
    /// Classify a raw I/O error by its `ErrorKind`, preferring structured
    /// matching over string inspection.
    pub fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::ConnectionRefused => ConnectError::Refused,
            std::io::ErrorKind::TimedOut => ConnectError::Timeout,
            _ => ConnectError::Other(err),
        }
    }

    pub fn close_reason(&self) -> crate::codec::CloseReason {
        use crate::codec::CloseReason;
        match self {
            ConnectError::Refused => CloseReason::Refused,
            ConnectError::Timeout => CloseReason::Timeout,
            ConnectError::Unreachable(_) => CloseReason::Unreachable,
            ConnectError::Other(_) => CloseReason::Unreachable,
        }
    }
}

/// Session-level failures. These never tear down a single stream; they
/// terminate the whole session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("websocket send failed: {0}")]
    WsSend(String),
    #[error("websocket receive failed: {0}")]
    WsReceive(String),
}
