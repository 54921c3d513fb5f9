//! Transport error types

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Timeout waiting for response")]
    Timeout,

    #[error("Device disconnected")]
    Disconnected,

    #[error("Short response: expected at least {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    // HID-specific errors
    #[error("HID error: {0}")]
    HidError(String),

    #[error("HID permission denied: {0}")]
    HidPermissionDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            TransportError::HidPermissionDenied(msg)
        } else {
            TransportError::HidError(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_error_is_classified() {
        let err = TransportError::from(hidapi::HidError::HidApiError {
            message: "open failed: Permission denied".into(),
        });
        assert!(matches!(err, TransportError::HidPermissionDenied(_)));

        let err = TransportError::from(hidapi::HidError::HidApiError {
            message: "write failed".into(),
        });
        assert!(matches!(err, TransportError::HidError(_)));
    }
}
