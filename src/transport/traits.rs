//! The core [`Transport`] trait.
//!
//! Abstracts over asynchronous byte-level access to the modem so that both
//! real hardware ports and mock implementations can be used interchangeably.

use async_trait::async_trait;

use super::error::TransportError;

/// Asynchronous byte-level transport to the modem.
///
/// The engine task holds the transport exclusively for the lifetime of a
/// session; at most one write is in flight on the wire at any instant.
/// Implementations add no framing of their own; the protocol layer decides
/// what terminators to append.
#[async_trait]
pub trait Transport: Send {
    /// Write all of `data` to the line.
    ///
    /// Returns once every byte has been handed to the underlying transport.
    async fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read a chunk of bytes into `buf`, waiting until at least one byte is
    /// available.
    ///
    /// Returns the number of bytes read. A return of `0` means the peer end
    /// of the transport has gone away and no further data will arrive.
    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Close the transport. Idempotent; safe to call on an already-closed
    /// handle. Subsequent reads and writes fail with
    /// [`TransportError::Closed`].
    async fn close(&mut self) -> Result<(), TransportError>;

    /// The port path or identifier of this transport.
    fn name(&self) -> &str;
}
