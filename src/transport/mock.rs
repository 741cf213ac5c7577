//! Mock transport for testing the protocol engine without hardware.
//!
//! [`MockTransport`] implements [`Transport`] against an in-memory byte
//! channel. The paired [`MockModem`] handle plays the part of the modem
//! firmware: tests script replies keyed on substrings of outbound writes,
//! push unsolicited lines, and inspect everything the engine wrote.
//!
//! # Example
//! ```
//! use sms_modem::transport::MockTransport;
//!
//! let (_transport, modem) = MockTransport::new("MOCK0");
//! modem.reply_to("AT\r\n", &["OK"]);
//! modem.push_line("RING");
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::TransportError;
use super::traits::Transport;

/// A scripted reply: when a write contains `pattern`, the modem answers with
/// `lines` (each delivered CRLF-terminated).
struct ScriptedReply {
    pattern: String,
    lines: Vec<String>,
}

/// Shared state between the transport half and the [`MockModem`] handle.
struct MockState {
    inbound_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    write_log: Vec<Vec<u8>>,
    replies: Vec<ScriptedReply>,
    fail_next_write: bool,
}

/// Mock serial transport. Construct with [`MockTransport::new`], hand the
/// transport to the session, and keep the [`MockModem`] in the test.
pub struct MockTransport {
    name: String,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: VecDeque<u8>,
    state: Arc<Mutex<MockState>>,
    open: bool,
}

/// Test-side handle simulating the modem firmware.
#[derive(Clone)]
pub struct MockModem {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a connected mock transport / mock modem pair.
    pub fn new(name: impl Into<String>) -> (Self, MockModem) {
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(MockState {
            inbound_tx: Some(inbound_tx),
            write_log: Vec::new(),
            replies: Vec::new(),
            fail_next_write: false,
        }));

        let transport = Self {
            name: name.into(),
            inbound,
            pending: VecDeque::new(),
            state: Arc::clone(&state),
            open: true,
        };

        (transport, MockModem { state })
    }
}

impl MockModem {
    /// Script a reply: when the engine writes bytes containing `pattern`,
    /// deliver each of `lines` (CRLF-terminated) on the inbound stream.
    /// Each scripted reply fires at most once; rules are matched in the
    /// order they were added.
    pub fn reply_to(&self, pattern: &str, lines: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.replies.push(ScriptedReply {
            pattern: pattern.to_string(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        });
    }

    /// Push a single unsolicited line (CRLF appended) to the engine.
    pub fn push_line(&self, line: &str) {
        self.push_bytes(format!("{line}\r\n").as_bytes());
    }

    /// Push raw bytes to the engine, exactly as given.
    pub fn push_bytes(&self, bytes: &[u8]) {
        let state = self.state.lock().unwrap();
        if let Some(tx) = &state.inbound_tx {
            let _ = tx.send(bytes.to_vec());
        }
    }

    /// Make the next write fail with an I/O error.
    pub fn fail_next_write(&self) {
        self.state.lock().unwrap().fail_next_write = true;
    }

    /// Simulate the remote end going away: once buffered data is drained,
    /// reads return 0 (end of stream).
    pub fn close_remote(&self) {
        self.state.lock().unwrap().inbound_tx = None;
    }

    /// Every write the engine has made, one entry per `write_bytes` call.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().write_log.clone()
    }

    /// The write log rendered as lossy UTF-8, for line-level assertions.
    pub fn writes_utf8(&self) -> Vec<String> {
        self.writes()
            .into_iter()
            .map(|w| String::from_utf8_lossy(&w).into_owned())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "simulated write failure",
            )));
        }

        state.write_log.push(data.to_vec());

        // Fire the first scripted reply whose pattern occurs in this write.
        let written = String::from_utf8_lossy(data).into_owned();
        if let Some(idx) = state
            .replies
            .iter()
            .position(|r| written.contains(&r.pattern))
        {
            let reply = state.replies.remove(idx);
            if let Some(tx) = &state.inbound_tx {
                for line in reply.lines {
                    let _ = tx.send(format!("{line}\r\n").into_bytes());
                }
            }
        }

        Ok(())
    }

    async fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }

        if self.pending.is_empty() {
            match self.inbound.recv().await {
                Some(chunk) => self.pending.extend(chunk),
                None => return Ok(0),
            }
        }

        let mut n = 0;
        while n < buf.len() {
            match self.pending.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("name", &self.name)
            .field("open", &self.open)
            .finish()
    }
}
