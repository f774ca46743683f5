//! Interactive shell bridge: output buffer and command lifecycle.

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::ShellState;
use crate::error::SshRelayError;
use crate::output::plain_text;
use crate::transport::ChannelRequest;
use crate::Result;

/// Point-in-time view of a session's command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSnapshot {
    pub output: String,
    pub is_running: bool,
    pub is_error: bool,
    pub exit_code: Option<u32>,
}

#[derive(Default)]
struct ShellInner {
    state: ShellState,
    output: Vec<u8>,
    is_error: bool,
    exit_code: Option<u32>,
    channel: Option<mpsc::Sender<ChannelRequest>>,
    /// Bumped on every dispatch so a stale pump cannot touch a newer command.
    generation: u64,
}

/// Per-session command state guarded by one mutex.
///
/// Only the channel pump of the current command appends output; dispatch
/// resets it; readers take copies.
#[derive(Default)]
pub struct ShellBridge {
    inner: Mutex<ShellInner>,
}

/// Ticket identifying one dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch(u64);

impl ShellBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ShellInner>> {
        self.inner.lock().map_err(|_| SshRelayError::LockPoisoned)
    }

    /// Current state.
    pub fn state(&self) -> Result<ShellState> {
        Ok(self.lock()?.state)
    }

    /// Claim the bridge for a new command and clear the previous output.
    ///
    /// Fails with `AlreadyRunning` without touching the buffer if a command
    /// is in flight.
    pub fn begin_dispatch(&self, session: &str) -> Result<Dispatch> {
        let mut inner = self.lock()?;
        match inner.state {
            ShellState::Terminating => {
                return Err(SshRelayError::TransportClosure(format!(
                    "session {session} is shutting down"
                )))
            }
            state if state.is_running() => {
                return Err(SshRelayError::AlreadyRunning(session.to_string()))
            }
            _ => {}
        }

        inner.state.transition_to(ShellState::AwaitingDispatch)?;
        inner.output.clear();
        inner.is_error = false;
        inner.exit_code = None;
        inner.generation += 1;
        Ok(Dispatch(inner.generation))
    }

    /// The command channel is open; output may now flow.
    pub fn attach(&self, ticket: Dispatch, requests: mpsc::Sender<ChannelRequest>) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.generation != ticket.0 || inner.state.is_terminal() {
            return Err(SshRelayError::TransportClosure(
                "session closed before the command started".into(),
            ));
        }
        inner.state.transition_to(ShellState::Running)?;
        inner.channel = Some(requests);
        Ok(())
    }

    /// The command channel could not be opened.
    pub fn dispatch_failed(&self, ticket: Dispatch, message: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.generation != ticket.0 || inner.state != ShellState::AwaitingDispatch {
            return Ok(());
        }
        inner.output = message.as_bytes().to_vec();
        inner.is_error = true;
        inner.state.transition_to(ShellState::Idle)
    }

    /// Append bytes from the channel. Diagnostic bytes mark the command as
    /// errored.
    pub fn append(&self, ticket: Dispatch, bytes: &[u8], diagnostic: bool) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.generation != ticket.0 || inner.state != ShellState::Running {
            return Ok(());
        }
        trace!(len = bytes.len(), diagnostic, "Output appended");
        inner.output.extend_from_slice(bytes);
        if diagnostic {
            inner.is_error = true;
        }
        Ok(())
    }

    /// Remember the exit status for display. Does not affect `is_error`.
    pub fn record_exit(&self, ticket: Dispatch, code: u32) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.generation == ticket.0 && inner.state == ShellState::Running {
            inner.exit_code = Some(code);
        }
        Ok(())
    }

    /// The channel closed; go back to idle and drop it.
    pub fn finish(&self, ticket: Dispatch) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.generation != ticket.0 || inner.state != ShellState::Running {
            return Ok(());
        }
        inner.channel = None;
        debug!(exit_code = ?inner.exit_code, "Command finished");
        inner.state.transition_to(ShellState::Idle)
    }

    /// Sender for the running command's channel.
    ///
    /// While the channel is still being opened the command already reads
    /// as running, so this fails with the retryable `DispatchPending`
    /// rather than `NoActiveCommand`.
    pub fn request_sender(&self) -> Result<mpsc::Sender<ChannelRequest>> {
        let inner = self.lock()?;
        match (&inner.state, &inner.channel) {
            (ShellState::Running, Some(tx)) => Ok(tx.clone()),
            (ShellState::AwaitingDispatch, _) => Err(SshRelayError::DispatchPending),
            _ => Err(SshRelayError::NoActiveCommand),
        }
    }

    /// Copy out the current output and flags.
    pub fn snapshot(&self) -> Result<OutputSnapshot> {
        self.view(false)
    }

    /// Like [`ShellBridge::snapshot`], optionally rendering the text as
    /// plain text. Flags and text come from the same critical section.
    pub fn view(&self, plain: bool) -> Result<OutputSnapshot> {
        let inner = self.lock()?;
        let output = if plain {
            plain_text(&inner.output)
        } else {
            String::from_utf8_lossy(&inner.output).into_owned()
        };
        Ok(OutputSnapshot {
            output,
            is_running: inner.state.is_running(),
            is_error: inner.is_error,
            exit_code: inner.exit_code,
        })
    }

    /// Enter the terminal state. Returns the open channel, if any, so the
    /// caller can close it.
    pub fn terminate(&self) -> Result<Option<mpsc::Sender<ChannelRequest>>> {
        let mut inner = self.lock()?;
        if inner.state.is_terminal() {
            return Ok(None);
        }
        inner.state.transition_to(ShellState::Terminating)?;
        Ok(inner.channel.take())
    }
}
