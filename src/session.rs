//! Modem session: connection lifecycle and the SMS send operation.
//!
//! A [`ModemSession`] drives exactly one GSM modem on one serial line. The
//! session owns the engine task for its lifetime, sequences the
//! initialization handshake (`AT`, `AT+CMGF=1`, `AT+CNMI=2,2,0,0,0`), and
//! exposes [`send_sms`](ModemSession::send_sms), including the raw
//! body-plus-Ctrl+Z write that does not fit the one-command-one-response
//! model of the queue.
//!
//! Concurrent callers are safe: ordinary commands serialize through the
//! queue, and the entire send sequence (CMGS, settle delay, body write) is
//! additionally held under a session-level async lock so two sends can
//! never interleave their body writes on the wire.

use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::queue::{self, CommandQueue, Request};
use crate::transport::{SerialTransport, Transport};

/// The initialization handshake, strictly in order: connectivity test,
/// text-mode SMS, unsolicited-notification mode.
const INIT_COMMANDS: [&str; 3] = ["AT", "AT+CMGF=1", "AT+CNMI=2,2,0,0,0"];

/// SMS body terminator (Ctrl+Z), written directly after the message text
/// with no CRLF in between.
const SMS_TERMINATOR: u8 = 0x1a;

/// Characters stripped from phone numbers before dialing: spaces, dashes,
/// parentheses.
static NON_DIALABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\s\-()]").expect("phone number pattern is valid")
});

/// Lifecycle of a modem session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport held.
    Disconnected,
    /// Transport opened, engine starting, boot chatter settling.
    Connecting,
    /// Running the AT handshake.
    Initializing,
    /// Handshake complete; `send_sms` is available.
    Ready,
}

struct SessionInner {
    state: SessionState,
    engine: Option<CommandQueue>,
}

/// A stateful session against one GSM modem.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct ModemSession {
    config: ModemConfig,
    inner: Mutex<SessionInner>,
    /// Serializes entire `send_sms` calls so the unqueued body write can
    /// never interleave with another caller's CMGS exchange.
    send_lock: tokio::sync::Mutex<()>,
}

impl ModemSession {
    /// Create a session with default timings (9600 baud, the stock GSM
    /// settle delays and timeouts).
    pub fn new() -> Self {
        Self::with_config(ModemConfig::default())
    }

    /// Create a session with explicit timings.
    pub fn with_config(config: ModemConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(SessionInner {
                state: SessionState::Disconnected,
                engine: None,
            }),
            send_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The session's current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Open `port` at the configured baud rate and run the init handshake.
    pub async fn connect(&self, port: &str) -> Result<()> {
        self.connect_with_baud(port, self.config.baud_rate).await
    }

    /// Open `port` at an explicit baud rate and run the init handshake.
    pub async fn connect_with_baud(&self, port: &str, baud_rate: u32) -> Result<()> {
        self.begin_connect()?;

        let transport = match SerialTransport::open(port, baud_rate) {
            Ok(t) => t,
            Err(source) => {
                self.teardown();
                return Err(ModemError::PortUnavailable {
                    port: port.to_string(),
                    source,
                });
            }
        };

        self.initialize(Box::new(transport)).await
    }

    /// Run the session over an already-open transport.
    ///
    /// This is the injection seam for testing and for alternative serial
    /// backends: the handshake and send path behave exactly as with
    /// [`connect`](Self::connect).
    pub async fn connect_transport(&self, transport: Box<dyn Transport>) -> Result<()> {
        self.begin_connect()?;
        self.initialize(transport).await
    }

    /// Send an SMS to `phone_number`. Returns `true` once the modem
    /// acknowledges the message (`+CMGS:` or `OK`).
    ///
    /// The number is normalized by stripping spaces, dashes, and
    /// parentheses. The `AT+CMGS` command goes through the regular queue;
    /// after a fixed prompt settle delay the body and Ctrl+Z terminator are
    /// written directly and awaited on a dedicated 30-second correlation.
    pub async fn send_sms(&self, phone_number: &str, message: &str) -> Result<bool> {
        let _send_guard = self.send_lock.lock().await;

        if self.state() != SessionState::Ready {
            return Err(ModemError::NotConnected);
        }

        let number = normalize_number(phone_number);
        info!(%number, "sending SMS");

        let cmgs = format!("AT+CMGS=\"{number}\"");
        self.run_command(&cmgs, self.config.command_timeout())
            .await?;

        // The modem follows CMGS with a `>` prompt inviting the body; the
        // engine does not watch for the prompt character and instead waits
        // a fixed settle interval before writing.
        sleep(self.config.prompt_settle()).await;

        let mut body = message.as_bytes().to_vec();
        body.push(SMS_TERMINATOR);

        match self
            .send_raw(body, "sms-body", self.config.send_timeout())
            .await
        {
            Ok(line) => {
                debug!(%line, "SMS acknowledged");
                Ok(true)
            }
            Err(ModemError::CommandTimeout { .. }) => Err(ModemError::SmsSendTimeout),
            Err(ModemError::CommandFailed { response, .. }) => {
                Err(ModemError::SmsSendFailed(response))
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the connection. Idempotent; never fails. Outstanding commands
    /// and sends fail with [`ModemError::ChannelClosed`] instead of
    /// hanging.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock();
        if let Some(engine) = inner.engine.take() {
            engine.abort();
            info!("modem session disconnected");
        }
        inner.state = SessionState::Disconnected;
    }

    // ---- internals -----------------------------------------------------

    /// Claim the session for a new connection attempt.
    fn begin_connect(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::Disconnected {
            return Err(ModemError::AlreadyConnected);
        }
        inner.state = SessionState::Connecting;
        Ok(())
    }

    /// Spawn the engine over `transport` and run the handshake.
    async fn initialize(&self, transport: Box<dyn Transport>) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            inner.engine = Some(CommandQueue::spawn(transport));
        }

        // Let the modem's own boot chatter clear before the first command.
        sleep(self.config.boot_settle()).await;

        self.inner.lock().state = SessionState::Initializing;

        for step in INIT_COMMANDS {
            match self.run_command(step, self.config.init_timeout()).await {
                Ok(response) => debug!(command = step, %response, "handshake step complete"),
                Err(source) => {
                    self.teardown();
                    return Err(ModemError::HandshakeFailed {
                        step,
                        source: Box::new(source),
                    });
                }
            }
            sleep(self.config.step_settle()).await;
        }

        self.inner.lock().state = SessionState::Ready;
        info!("modem session ready");
        Ok(())
    }

    /// Release the engine and return to `Disconnected` after a failure.
    fn teardown(&self) {
        let mut inner = self.inner.lock();
        if let Some(engine) = inner.engine.take() {
            engine.abort();
        }
        inner.state = SessionState::Disconnected;
    }

    /// A sender into the engine's FIFO, or `NotConnected`.
    fn sender(&self) -> Result<mpsc::Sender<Request>> {
        let inner = self.inner.lock();
        inner
            .engine
            .as_ref()
            .map(|e| e.sender())
            .ok_or(ModemError::NotConnected)
    }

    async fn run_command(&self, text: &str, timeout: Duration) -> Result<String> {
        let tx = self.sender()?;
        queue::run_command(&tx, text, timeout).await
    }

    async fn send_raw(&self, bytes: Vec<u8>, label: &str, timeout: Duration) -> Result<String> {
        let tx = self.sender()?;
        queue::send_raw(&tx, bytes, label, timeout).await
    }
}

impl Default for ModemSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip spaces, dashes, and parentheses from a phone number.
pub(crate) fn normalize_number(raw: &str) -> String {
    NON_DIALABLE.replace_all(raw, "").into_owned()
}
