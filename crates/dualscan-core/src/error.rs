//! Error types for dualscan-core.
//!
//! Discovery itself never surfaces these to the caller: `discover()` absorbs
//! and logs every internal fault and only ever returns the final device list.
//! The error type exists for the platform-trait seams (adapter, scanner,
//! transport) and for the stream-connect step, where callers do want to know
//! why a connection attempt failed.

use thiserror::Error;

/// Errors that can occur at the platform seams and the connect step.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy backend error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// No radio adapter is present on this host.
    #[error("no Bluetooth adapter available")]
    AdapterUnavailable,

    /// The adapter exists but the radio is switched off.
    #[error("Bluetooth adapter is disabled")]
    AdapterDisabled,

    /// A required runtime permission is not granted.
    #[error("permission not granted: {permission:?}")]
    PermissionDenied {
        /// The permission that was missing.
        permission: dualscan_types::Permission,
    },

    /// Broadcast receiver registration failed.
    #[error("receiver registration failed: {0}")]
    SubscribeFailed(String),

    /// The subscription handle was not registered (or already removed).
    ///
    /// Teardown treats this as a non-error; it is surfaced so platform
    /// implementations can distinguish it from real failures.
    #[error("subscription {id} not registered")]
    NotSubscribed {
        /// The handle that was not found.
        id: u64,
    },

    /// A scan could not be started.
    #[error("scan start failed: {0}")]
    ScanStartFailed(String),

    /// The platform reported an asynchronous scan failure.
    #[error("scan failed with platform code {code}")]
    ScanFailed {
        /// Platform diagnostic code.
        code: i32,
    },

    /// No discovered device matches the requested display name.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// The display name that was looked up.
        name: String,
    },

    /// I/O error while opening or closing a stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a subscription-failure error.
    pub fn subscribe_failed(message: impl Into<String>) -> Self {
        Self::SubscribeFailed(message.into())
    }

    /// Create a scan-start-failure error.
    pub fn scan_start_failed(message: impl Into<String>) -> Self {
        Self::ScanStartFailed(message.into())
    }

    /// Create a device-not-found error for a display name.
    pub fn device_not_found(name: impl Into<String>) -> Self {
        Self::DeviceNotFound { name: name.into() }
    }

    /// Create a permission-denied error.
    pub fn permission_denied(permission: dualscan_types::Permission) -> Self {
        Self::PermissionDenied { permission }
    }
}

/// Result type alias using dualscan-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use dualscan_types::Permission;

    #[test]
    fn test_error_display() {
        let err = Error::device_not_found("Printer1");
        assert!(err.to_string().contains("Printer1"));

        let err = Error::AdapterDisabled;
        assert_eq!(err.to_string(), "Bluetooth adapter is disabled");

        let err = Error::ScanFailed { code: 2 };
        assert!(err.to_string().contains("2"));

        let err = Error::permission_denied(Permission::Connect);
        assert!(err.to_string().contains("Connect"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_not_subscribed_display() {
        let err = Error::NotSubscribed { id: 7 };
        assert!(err.to_string().contains("7"));
    }
}
