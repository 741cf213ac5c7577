//! Command queue and scheduler.
//!
//! Guarantees at most one outstanding AT command at a time, no matter how
//! many callers are issuing commands concurrently. The queue is realized as
//! a dedicated engine task that owns the transport exclusively: requests
//! arrive over an `mpsc` channel (FIFO by enqueue time), each is dispatched,
//! correlated against inbound lines, and resolved through its `oneshot`
//! before the next request is taken. A stuck command consumes exactly its
//! own timeout window and never blocks the queue beyond that.
//!
//! While no command is in flight the task keeps draining the line stream so
//! late responses to timed-out commands and unsolicited modem chatter are
//! discarded instead of leaking into the next command's correlation.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::correlator::Correlator;
use crate::error::ModemError;
use crate::framing::LineBuffer;
use crate::transport::Transport;

/// Outbound command terminator.
const CRLF: &[u8] = b"\r\n";

/// Transport read chunk size. AT responses are short lines.
const READ_CHUNK: usize = 256;

/// Depth of the pending-command channel.
const QUEUE_DEPTH: usize = 16;

/// A unit of work for the engine task.
pub(crate) enum Request {
    /// A framed AT command: written with a trailing CRLF, resolved by the
    /// first terminal line.
    Command {
        text: String,
        timeout: Duration,
        response_tx: oneshot::Sender<Result<String, ModemError>>,
    },
    /// Raw bytes written without framing (the SMS body + Ctrl+Z path),
    /// correlated by a dedicated resolver with its own timeout.
    SendRaw {
        bytes: Vec<u8>,
        label: String,
        timeout: Duration,
        response_tx: oneshot::Sender<Result<String, ModemError>>,
    },
}

/// Handle to the engine task serializing access to one serial line.
pub(crate) struct CommandQueue {
    tx: mpsc::Sender<Request>,
    task: JoinHandle<()>,
}

impl CommandQueue {
    /// Spawn the engine task over `transport`.
    pub(crate) fn spawn(transport: Box<dyn Transport>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let task = tokio::spawn(engine_loop(transport, rx));
        Self { tx, task }
    }

    /// A sender for submitting requests. Clones share the same FIFO.
    pub(crate) fn sender(&self) -> mpsc::Sender<Request> {
        self.tx.clone()
    }

    /// Tear the engine down immediately. Pending and in-flight requests
    /// observe a dropped response channel rather than hanging.
    pub(crate) fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Enqueue a framed AT command and wait for its terminal response line.
pub(crate) async fn run_command(
    tx: &mpsc::Sender<Request>,
    text: &str,
    timeout: Duration,
) -> Result<String, ModemError> {
    let (response_tx, response_rx) = oneshot::channel();
    tx.send(Request::Command {
        text: text.to_string(),
        timeout,
        response_tx,
    })
    .await
    .map_err(|_| ModemError::ChannelClosed)?;
    response_rx.await.map_err(|_| ModemError::ChannelClosed)?
}

/// Write raw bytes outside the command framing and wait for a terminal line.
pub(crate) async fn send_raw(
    tx: &mpsc::Sender<Request>,
    bytes: Vec<u8>,
    label: &str,
    timeout: Duration,
) -> Result<String, ModemError> {
    let (response_tx, response_rx) = oneshot::channel();
    tx.send(Request::SendRaw {
        bytes,
        label: label.to_string(),
        timeout,
        response_tx,
    })
    .await
    .map_err(|_| ModemError::ChannelClosed)?;
    response_rx.await.map_err(|_| ModemError::ChannelClosed)?
}

/// Drain loop: service requests one at a time; between requests, keep the
/// inbound line stream flowing and discard whatever arrives.
async fn engine_loop(mut transport: Box<dyn Transport>, mut rx: mpsc::Receiver<Request>) {
    let mut framer = LineBuffer::new();
    let mut correlator = Correlator::new();
    let mut idle_buf = [0u8; READ_CHUNK];

    loop {
        tokio::select! {
            biased;

            req = rx.recv() => match req {
                Some(req) => {
                    service_request(&mut *transport, &mut framer, &mut correlator, req).await;
                }
                None => {
                    debug!("all queue handles dropped, stopping engine");
                    break;
                }
            },

            res = transport.read_bytes(&mut idle_buf) => match res {
                Ok(0) => {
                    debug!("transport reached end of stream, stopping engine");
                    break;
                }
                Ok(n) => {
                    for line in framer.push_bytes(&idle_buf[..n]) {
                        debug!(%line, "discarding line, no command in flight");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "transport read failed while idle, stopping engine");
                    break;
                }
            },
        }
    }

    if let Err(e) = transport.close().await {
        debug!(error = %e, "error closing transport");
    }
}

/// Dispatch one request and pump the line stream until it resolves.
async fn service_request(
    transport: &mut dyn Transport,
    framer: &mut LineBuffer,
    correlator: &mut Correlator,
    request: Request,
) {
    let (payload, label, timeout, response_tx) = match request {
        Request::Command {
            text,
            timeout,
            response_tx,
        } => {
            let mut payload = text.clone().into_bytes();
            payload.extend_from_slice(CRLF);
            (payload, text, timeout, response_tx)
        }
        Request::SendRaw {
            bytes,
            label,
            timeout,
            response_tx,
        } => (bytes, label, timeout, response_tx),
    };

    debug!(command = %label, ?timeout, "dispatching");

    // A synchronous write failure rejects immediately; the timeout window
    // is only for awaiting the modem's answer.
    if let Err(e) = transport.write_bytes(&payload).await {
        let _ = response_tx.send(Err(ModemError::Transport(e)));
        return;
    }

    correlator.arm(label, response_tx);
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; READ_CHUNK];

    while correlator.is_armed() {
        match timeout_at(deadline, transport.read_bytes(&mut buf)).await {
            Err(_elapsed) => {
                let command = correlator.command().unwrap_or_default().to_string();
                debug!(%command, "command timed out");
                correlator.abort(ModemError::CommandTimeout { command });
            }
            Ok(Ok(0)) => {
                debug!("transport closed while awaiting response");
                correlator.abort(ModemError::Transport(
                    crate::transport::TransportError::Closed,
                ));
            }
            Ok(Ok(n)) => {
                for line in framer.push_bytes(&buf[..n]) {
                    if correlator.is_armed() {
                        correlator.offer(&line);
                    } else {
                        debug!(%line, "discarding trailing line after resolution");
                    }
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "transport read failed while command in flight");
                correlator.abort(ModemError::Transport(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, TransportError};
    use std::time::Duration;

    const T: Duration = Duration::from_secs(2);

    #[tokio::test(start_paused = true)]
    async fn test_command_resolves_on_ok() {
        let (transport, modem) = MockTransport::new("MOCK0");
        modem.reply_to("AT\r\n", &["OK"]);
        let queue = CommandQueue::spawn(Box::new(transport));

        let line = run_command(&queue.sender(), "AT", T).await.unwrap();
        assert_eq!(line, "OK");
        assert_eq!(modem.writes_utf8(), vec!["AT\r\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_dispatch_order() {
        let (transport, modem) = MockTransport::new("MOCK0");
        modem.reply_to("CMD1\r\n", &["OK"]);
        modem.reply_to("CMD2\r\n", &["OK"]);
        modem.reply_to("CMD3\r\n", &["OK"]);
        let queue = CommandQueue::spawn(Box::new(transport));
        let tx = queue.sender();

        let (r1, r2, r3) = tokio::join!(
            run_command(&tx, "CMD1", T),
            run_command(&tx, "CMD2", T),
            run_command(&tx, "CMD3", T),
        );
        r1.unwrap();
        r2.unwrap();
        r3.unwrap();

        assert_eq!(
            modem.writes_utf8(),
            vec!["CMD1\r\n", "CMD2\r\n", "CMD3\r\n"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_recovery_dispatches_next_command() {
        let (transport, modem) = MockTransport::new("MOCK0");
        // PING never answered; NEXT answered normally.
        modem.reply_to("NEXT\r\n", &["OK"]);
        let queue = CommandQueue::spawn(Box::new(transport));
        let tx = queue.sender();

        let start = Instant::now();
        let (ping, next) = tokio::join!(
            run_command(&tx, "PING", Duration::from_secs(5)),
            run_command(&tx, "NEXT", T),
        );

        match ping {
            Err(ModemError::CommandTimeout { command }) => assert_eq!(command, "PING"),
            other => panic!("expected CommandTimeout, got {other:?}"),
        }
        next.unwrap();

        // NEXT could only be dispatched after PING's full timeout window.
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(modem.writes_utf8(), vec!["PING\r\n", "NEXT\r\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_rejects_immediately() {
        let (transport, modem) = MockTransport::new("MOCK0");
        modem.fail_next_write();
        modem.reply_to("NEXT\r\n", &["OK"]);
        let queue = CommandQueue::spawn(Box::new(transport));
        let tx = queue.sender();

        let start = Instant::now();
        let result = run_command(&tx, "BAD", T).await;
        assert!(matches!(result, Err(ModemError::Transport(_))));
        // No timeout interval was consumed.
        assert_eq!(start.elapsed(), Duration::ZERO);

        run_command(&tx, "NEXT", T).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_informational_lines_leave_command_in_flight() {
        let (transport, modem) = MockTransport::new("MOCK0");
        modem.reply_to("AT\r\n", &["RING", "", "OK"]);
        let queue = CommandQueue::spawn(Box::new(transport));

        let line = run_command(&queue.sender(), "AT", T).await.unwrap();
        assert_eq!(line, "OK");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsolicited_lines_discarded_while_idle() {
        let (transport, modem) = MockTransport::new("MOCK0");
        let queue = CommandQueue::spawn(Box::new(transport));

        modem.push_line("RING");
        modem.push_line("+CMTI: \"SM\",1");
        tokio::task::yield_now().await;

        // The queue still works afterwards.
        modem.reply_to("AT\r\n", &["OK"]);
        run_command(&queue.sender(), "AT", T).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_raw_send_resolves_on_cmgs_ack() {
        let (transport, modem) = MockTransport::new("MOCK0");
        modem.reply_to("\x1a", &["+CMGS: 7"]);
        let queue = CommandQueue::spawn(Box::new(transport));

        let line = send_raw(
            &queue.sender(),
            b"Hello\x1a".to_vec(),
            "sms-body",
            Duration::from_secs(30),
        )
        .await
        .unwrap();
        assert_eq!(line, "+CMGS: 7");
        assert_eq!(modem.writes(), vec![b"Hello\x1a".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eof_rejects_in_flight_command() {
        let (transport, modem) = MockTransport::new("MOCK0");
        let queue = CommandQueue::spawn(Box::new(transport));
        let tx = queue.sender();

        let pending = tokio::spawn(async move { run_command(&tx, "AT", T).await });
        tokio::task::yield_now().await;
        modem.close_remote();

        let result = pending.await.unwrap();
        assert!(matches!(
            result,
            Err(ModemError::Transport(TransportError::Closed))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_fails_pending_with_channel_closed() {
        let (transport, _modem) = MockTransport::new("MOCK0");
        let queue = CommandQueue::spawn(Box::new(transport));
        let tx = queue.sender();

        let pending = tokio::spawn({
            let tx = tx.clone();
            async move { run_command(&tx, "AT", T).await }
        });
        tokio::task::yield_now().await;
        queue.abort();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(ModemError::ChannelClosed)));
    }
}
