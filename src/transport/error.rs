//! Transport-specific error types, separate from the session-level
//! [`ModemError`](crate::error::ModemError) so the physical layer stays
//! independent of protocol concerns.

use thiserror::Error;

/// Errors that can occur on the serial line itself.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The specified serial port was not found on the system.
    #[error("serial port not found: {0}")]
    NotFound(String),

    /// The port exists but the requested parameters were rejected.
    #[error("invalid port configuration: {0}")]
    Config(String),

    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport has been closed; no further I/O is possible.
    #[error("transport is closed")]
    Closed,
}

impl TransportError {
    /// Create a NotFound error from a port path.
    pub fn not_found(port: impl Into<String>) -> Self {
        Self::NotFound(port.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "serial port not found: /dev/ttyUSB0");

        let err = TransportError::config("bad baud rate");
        assert_eq!(err.to_string(), "invalid port configuration: bad baud rate");

        let err = TransportError::Closed;
        assert_eq!(err.to_string(), "transport is closed");
    }
}
