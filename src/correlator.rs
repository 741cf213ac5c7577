//! Response correlation: deciding which inbound line ends the wait for the
//! command currently on the wire.
//!
//! The modem interleaves unsolicited notifications (`RING`, `+CMTI:`) with
//! command responses, so the correlator deliberately narrows "what counts as
//! an answer" to the terminal tokens `OK`, `ERROR`, and `+CMGS:` instead of
//! parsing every vendor-specific line. Everything else is informational and
//! leaves the command in flight.
//!
//! At most one command is ever in flight: the slot is armed by the engine
//! when a command is dispatched and cleared when a terminal line arrives or
//! the command is aborted (timeout, transport failure). Lines seen while
//! the slot is empty are discarded by the caller.

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::ModemError;

/// How a single response line relates to the in-flight command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineClass {
    /// Terminal failure: the line contains `ERROR`.
    Failure,
    /// Terminal success: the line contains `OK` or `+CMGS:`.
    Success,
    /// Not a terminal token; ignored by the correlator.
    Informational,
}

/// Classify a trimmed, non-blank response line.
///
/// `ERROR` wins over `OK` when a line somehow contains both.
pub(crate) fn classify_line(line: &str) -> LineClass {
    if line.contains("ERROR") {
        LineClass::Failure
    } else if line.contains("OK") || line.contains("+CMGS:") {
        LineClass::Success
    } else {
        LineClass::Informational
    }
}

/// The resolver for the currently dispatched command.
struct InFlight {
    command: String,
    response_tx: oneshot::Sender<Result<String, ModemError>>,
}

/// Single-slot registry holding the resolver for the in-flight command.
#[derive(Default)]
pub(crate) struct Correlator {
    slot: Option<InFlight>,
}

impl Correlator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Install the resolver for a freshly dispatched command.
    ///
    /// The slot must be empty: the engine clears it before dispatching the
    /// next command, which is what prevents cross-talk between overlapping
    /// commands.
    pub(crate) fn arm(
        &mut self,
        command: impl Into<String>,
        response_tx: oneshot::Sender<Result<String, ModemError>>,
    ) {
        debug_assert!(self.slot.is_none(), "correlator slot already armed");
        self.slot = Some(InFlight {
            command: command.into(),
            response_tx,
        });
    }

    /// Whether a command is currently awaiting its terminal response.
    pub(crate) fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// The in-flight command text, if any.
    pub(crate) fn command(&self) -> Option<&str> {
        self.slot.as_ref().map(|i| i.command.as_str())
    }

    /// Offer an inbound line to the in-flight command.
    ///
    /// Returns `true` if the line was terminal and the slot was consumed.
    /// Informational lines leave the slot armed; with no slot armed the
    /// line is not consumed and the caller discards it.
    pub(crate) fn offer(&mut self, line: &str) -> bool {
        if self.slot.is_none() {
            return false;
        }

        match classify_line(line) {
            LineClass::Informational => {
                debug!(%line, "informational line while command in flight");
                false
            }
            class => {
                if let Some(inflight) = self.slot.take() {
                    let outcome = match class {
                        LineClass::Failure => Err(ModemError::CommandFailed {
                            command: inflight.command,
                            response: line.to_string(),
                        }),
                        _ => Ok(line.to_string()),
                    };
                    let _ = inflight.response_tx.send(outcome);
                }
                true
            }
        }
    }

    /// Clear the slot and reject the in-flight command with `err`.
    ///
    /// No-op when nothing is in flight.
    pub(crate) fn abort(&mut self, err: ModemError) {
        if let Some(inflight) = self.slot.take() {
            let _ = inflight.response_tx.send(Err(err));
        }
    }
}
