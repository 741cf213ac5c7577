//! Transport abstraction for the modem's serial line.
//!
//! The [`Transport`] trait owns the physical link: raw byte writes out, raw
//! byte chunks in, explicit open and close. Everything above it (framing,
//! correlation, the session handshake) operates on the trait, so the real
//! port and the scripted mock are interchangeable.

pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;

pub use error::TransportError;
pub use mock::{MockModem, MockTransport};
pub use serial::SerialTransport;
pub use traits::Transport;
