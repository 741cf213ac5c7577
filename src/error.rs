//! Unified error handling for the modem engine.
//!
//! Errors fall into the taxonomy the session exposes to callers: transport
//! failures, protocol failures (a terminal `ERROR` line), timeouts, and
//! state errors. The engine performs no internal retries; every error
//! propagates to the immediate caller of `connect`/`send_sms`.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by the public modem session operations.
#[derive(Debug, Error)]
pub enum ModemError {
    /// The serial port could not be opened.
    #[error("serial port `{port}` unavailable: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: TransportError,
    },

    /// `connect` was called while a session is already established.
    #[error("session is already connected")]
    AlreadyConnected,

    /// An operation requires an open session, but none is established.
    #[error("not connected to a modem")]
    NotConnected,

    /// A transport-level failure while the session was active.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The modem answered a command with a terminal `ERROR` line.
    #[error("command `{command}` failed: {response}")]
    CommandFailed { command: String, response: String },

    /// No terminal response arrived within the command's timeout window.
    #[error("command `{command}` timed out")]
    CommandTimeout { command: String },

    /// An initialization handshake step failed, aborting `connect`.
    #[error("modem handshake failed at `{step}`: {source}")]
    HandshakeFailed {
        step: &'static str,
        #[source]
        source: Box<ModemError>,
    },

    /// The modem rejected the SMS body with a terminal `ERROR` line.
    #[error("SMS send failed: {0}")]
    SmsSendFailed(String),

    /// The modem never acknowledged the SMS body.
    #[error("SMS send timed out")]
    SmsSendTimeout,

    /// The engine task went away while a caller was waiting on it,
    /// typically because `disconnect` was called mid-operation.
    #[error("command channel closed")]
    ChannelClosed,
}

/// A convenience `Result` alias using [`ModemError`] as the error type.
pub type Result<T> = std::result::Result<T, ModemError>;
