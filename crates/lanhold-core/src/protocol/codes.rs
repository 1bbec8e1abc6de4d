//! Wire error codes for the control surface.
//!
//! Every failure a caller can observe is reported as data: a stable
//! machine-readable [`ErrorCode`] plus a human-readable message.  The domain
//! errors convert into [`ControlError`] through `From`, so the application
//! layer can use `?` and the mapping lives in exactly one place.
//!
//! | Domain error                         | Code             |
//! |--------------------------------------|------------------|
//! | `OpenError::*`                       | `ACQUIRE_FAILED` |
//! | `RequestError::*`, missing arguments | `INVALID_ARGS`   |
//! | `SendError::NotOpen`                 | `NO_SOCKET`      |
//! | any other `SendError`                | `SEND_FAILED`    |
//! | unknown method name                  | `NOT_IMPLEMENTED`|
//!
//! `RELEASE_FAILED` is part of the wire vocabulary but release absorbs and
//! logs teardown failures, so the host never emits it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    lifecycle::{OpenError, SendError},
    request::RequestError,
};

/// Machine-readable error code carried in every error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A power hold was denied or the socket could not be bound.
    AcquireFailed,
    /// Reserved; release never surfaces a failure.
    ReleaseFailed,
    /// An argument was missing or out of range.
    InvalidArgs,
    /// Send attempted while the channel is closed.
    NoSocket,
    /// The datagram could not be transmitted.
    SendFailed,
    /// The method name is not part of the control surface.
    NotImplemented,
}

impl ErrorCode {
    /// The code exactly as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AcquireFailed => "ACQUIRE_FAILED",
            ErrorCode::ReleaseFailed => "RELEASE_FAILED",
            ErrorCode::InvalidArgs => "INVALID_ARGS",
            ErrorCode::NoSocket => "NO_SOCKET",
            ErrorCode::SendFailed => "SEND_FAILED",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error as reported across the control surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ControlError {
    pub code: ErrorCode,
    pub message: String,
}

impl ControlError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// A missing or malformed argument.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgs, message)
    }

    /// A method name the host does not handle.
    pub fn not_implemented(method: &str) -> Self {
        Self::new(
            ErrorCode::NotImplemented,
            format!("method '{method}' is not implemented"),
        )
    }
}

impl From<OpenError> for ControlError {
    fn from(err: OpenError) -> Self {
        Self::new(ErrorCode::AcquireFailed, err.to_string())
    }
}

impl From<SendError> for ControlError {
    fn from(err: SendError) -> Self {
        let code = if err.is_not_open() {
            ErrorCode::NoSocket
        } else {
            ErrorCode::SendFailed
        };
        Self::new(code, err.to_string())
    }
}

impl From<RequestError> for ControlError {
    fn from(err: RequestError) -> Self {
        Self::invalid_args(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::LockError;

    #[test]
    fn test_error_code_serializes_to_wire_string() {
        // Arrange / Act
        let json = serde_json::to_string(&ErrorCode::NoSocket).unwrap();

        // Assert
        assert_eq!(json, "\"NO_SOCKET\"");
    }

    #[test]
    fn test_error_code_as_str_matches_serde_for_every_variant() {
        for code in [
            ErrorCode::AcquireFailed,
            ErrorCode::ReleaseFailed,
            ErrorCode::InvalidArgs,
            ErrorCode::NoSocket,
            ErrorCode::SendFailed,
            ErrorCode::NotImplemented,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_not_open_maps_to_no_socket() {
        let err: ControlError = SendError::NotOpen.into();
        assert_eq!(err.code, ErrorCode::NoSocket);
    }

    #[test]
    fn test_resolution_failure_maps_to_send_failed_with_cause() {
        // Arrange
        let send_err = SendError::AddressResolutionFailed {
            address: "not-an-address".to_string(),
            reason: "not an IP literal".to_string(),
        };

        // Act
        let err: ControlError = send_err.into();

        // Assert
        assert_eq!(err.code, ErrorCode::SendFailed);
        assert!(err.message.contains("could not resolve destination not-an-address"));
    }

    #[test]
    fn test_open_error_maps_to_acquire_failed() {
        let err: ControlError =
            OpenError::LockUnavailable(LockError::ReceiveHoldDenied("denied".into())).into();
        assert_eq!(err.code, ErrorCode::AcquireFailed);
        assert!(err.message.contains("receive hold denied"));
    }

    #[test]
    fn test_request_error_maps_to_invalid_args() {
        let err: ControlError = RequestError::InvalidPort(0).into();
        assert_eq!(err.code, ErrorCode::InvalidArgs);
    }

    #[test]
    fn test_control_error_display_prefixes_code() {
        let err = ControlError::not_implemented("frobnicate");
        assert_eq!(
            err.to_string(),
            "NOT_IMPLEMENTED: method 'frobnicate' is not implemented"
        );
    }
}
