//! Real serial port transport backed by `tokio-serial`.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialStream;

use super::error::TransportError;
use super::traits::Transport;

/// An open serial line to the modem.
///
/// The port is opened explicitly by [`SerialTransport::open`]; there is no
/// auto-open. Dropping the transport releases the underlying file handle,
/// and [`Transport::close`] marks it closed so later I/O fails fast.
pub struct SerialTransport {
    inner: SerialStream,
    name: String,
    baud_rate: u32,
    open: bool,
}

impl SerialTransport {
    /// Open a serial port at the given path and baud rate (8N1, no flow
    /// control, the line settings every GSM modem speaks).
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let builder = tokio_serial::new(path, baud_rate).timeout(Duration::from_millis(100));

        let inner = SerialStream::open(&builder).map_err(|e| match e.kind {
            tokio_serial::ErrorKind::NoDevice => TransportError::not_found(path),
            tokio_serial::ErrorKind::InvalidInput => TransportError::config(e.to_string()),
            _ => TransportError::Io(std::io::Error::other(e.to_string())),
        })?;

        Ok(Self {
            inner,
            name: path.to_string(),
            baud_rate,
            open: true,
        })
    }

    /// The configured baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        self.inner.write_all(data).await.map_err(TransportError::Io)
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        self.inner.read(buf).await.map_err(TransportError::Io)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.open {
            self.open = false;
            let _ = self.inner.flush().await;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("baud_rate", &self.baud_rate)
            .field("open", &self.open)
            .finish()
    }
}
