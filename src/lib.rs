//! GSM Modem SMS Engine
//!
//! This library drives a GSM modem over a serial line to send SMS messages,
//! managing the stateful, half-duplex AT-command protocol: strict command
//! serialization, terminal-token response correlation, per-command
//! timeouts, and the two-phase `AT+CMGS` body sub-protocol.
//!
//! # Modules
//!
//! - `config`: session timings and baud rate, with TOML support
//! - `error`: unified error handling
//! - `framing`: CRLF line parsing of the inbound byte stream
//! - `ports`: serial port enumeration for operator selection
//! - `session`: connection lifecycle, init handshake, and `send_sms`
//! - `transport`: serial line abstraction, real and mock
//!
//! # Example
//!
//! ```no_run
//! use sms_modem::ModemSession;
//!
//! # async fn example() -> Result<(), sms_modem::ModemError> {
//! let session = ModemSession::new();
//! session.connect("/dev/ttyUSB0").await?;
//! session.send_sms("+1 (555) 123-4567", "Your ticket is ready.").await?;
//! session.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod framing;
pub mod ports;
pub mod session;
pub mod transport;

mod correlator;
mod queue;

// Re-export commonly used types for convenience
pub use config::{ConfigError, ModemConfig};
pub use error::{ModemError, Result};
pub use ports::{list_ports, PortDescriptor};
pub use session::{ModemSession, SessionState};
pub use transport::{MockModem, MockTransport, SerialTransport, Transport, TransportError};
