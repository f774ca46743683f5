//! Remote session manager.
//!
//! Owns the connection registry and drives each session's interactive
//! command channel. Command dispatch is fire-and-forget: it starts the
//! remote command and returns, while a background task feeds the channel's
//! output into the session buffer. Callers poll [`SessionManager::read_output`]
//! until `is_running` turns false.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SshRelayError;
use crate::security::RiskClassifier;
use crate::session::{
    ConnectionRegistry, Dispatch, OutputSnapshot, Session, SessionId, SessionInfo,
    SessionSummary,
};
use crate::transport::{
    capture, ChannelEvent, ChannelRequest, CommandChannel, Connector, Credentials, PtyRequest,
    Signal, Transport,
};
use crate::Result;

/// Command used to identify the remote operating system.
pub const PROBE_COMMAND: &str = "cat /etc/os-release";

/// Raw interrupt byte (ETX, what Ctrl-C sends).
const ETX: &[u8] = b"\x03";

/// Tuning for command channels.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// PTY requested for interactive commands; `None` runs them without one.
    pub pty: Option<PtyRequest>,
    /// Deliver signals natively; when false they become raw control bytes.
    pub native_signals: bool,
    /// Upper bound on the post-connect OS probe and other one-shot commands.
    pub probe_timeout: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            pty: Some(PtyRequest::default()),
            native_signals: true,
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Result of a successful connect.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectOutcome {
    pub success: bool,
    pub session_id: String,
    pub os_info: String,
}

/// Result of a dispatch request.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteOutcome {
    pub command: String,
    /// True when the command was held back for confirmation.
    pub is_risky: bool,
}

/// Entry point for every session operation.
pub struct SessionManager {
    registry: Arc<ConnectionRegistry>,
    connector: Arc<dyn Connector>,
    classifier: RiskClassifier,
    options: ManagerOptions,
}

impl SessionManager {
    /// Manager with its own registry, the baseline classifier and default
    /// options.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
            connector,
            classifier: RiskClassifier::new(),
            options: ManagerOptions::default(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<ConnectionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_classifier(mut self, classifier: RiskClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Resolve a live session by its external id.
    pub fn session(&self, id: &str) -> Result<Arc<Session>> {
        self.registry.lookup_str(id)
    }

    /// Authenticate, register the session, then probe the remote OS.
    ///
    /// The identifier is reserved up front but only becomes resolvable once
    /// authentication succeeds; a failed attempt releases it. Probe failure
    /// yields an empty descriptor and never fails the connect.
    ///
    /// Dropping the returned future before it completes releases the
    /// identifier and closes any connection it opened.
    pub async fn connect(&self, credentials: &Credentials) -> Result<ConnectOutcome> {
        let id = self.registry.allocate()?;
        let mut pending = PendingConnect {
            registry: self.registry.clone(),
            id,
            session: None,
            done: false,
        };

        let transport = match self.connector.connect(credentials).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!(host = %credentials.host, error = %e, "Connect failed");
                return Err(e);
            }
        };

        let session = Arc::new(Session::new(
            id,
            SessionInfo::new(&credentials.host, credentials.port, &credentials.username),
            transport,
        ));
        pending.session = Some(session.clone());
        self.registry.register(session.clone())?;
        self.spawn_closure_watch(session.clone());

        info!(
            session = %id,
            host = %credentials.host,
            user = %credentials.username,
            "Session established"
        );

        let os_info = self.probe(session.transport().as_ref()).await;
        session.info.set_os_info(os_info.clone());
        pending.complete();

        Ok(ConnectOutcome {
            success: true,
            session_id: id.to_string(),
            os_info,
        })
    }

    /// Tear the session down when the connection goes away on its own.
    fn spawn_closure_watch(&self, session: Arc<Session>) {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            session.transport().wait_closed().await;
            if !session.is_closed() {
                warn!(session = %session.id, "Connection closed by remote");
            }
            if let Err(e) = registry.release(&session.id) {
                warn!(session = %session.id, error = %e, "Failed to release session");
            }
            session.shutdown().await;
        });
    }

    async fn probe(&self, transport: &dyn Transport) -> String {
        match capture(transport, PROBE_COMMAND, self.options.probe_timeout).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "OS probe failed");
                String::new()
            }
        }
    }

    /// Start `command` on the session's interactive channel.
    ///
    /// Risky commands are held back (`is_risky: true`) unless `force` is
    /// set, without touching session state. A second dispatch while one is
    /// in flight fails with `AlreadyRunning`.
    pub async fn execute_command(
        &self,
        id: &str,
        command: &str,
        force: bool,
    ) -> Result<ExecuteOutcome> {
        let session = self.session(id)?;
        self.classifier.validate(command)?;

        if !force && self.classifier.is_risky(command) {
            info!(session = %session.id, "Risky command held for confirmation");
            return Ok(ExecuteOutcome {
                command: command.to_string(),
                is_risky: true,
            });
        }

        let ticket = session.shell.begin_dispatch(id)?;
        debug!(session = %session.id, command = %command, force, "Dispatching command");

        let channel = session
            .transport()
            .open_command(command, self.options.pty.as_ref())
            .await;

        match channel {
            Ok(CommandChannel { events, requests }) => {
                if let Err(e) = session.shell.attach(ticket, requests.clone()) {
                    let _ = requests.send(ChannelRequest::Close).await;
                    return Err(e);
                }
                tokio::spawn(pump_output(session.clone(), ticket, events));
                Ok(ExecuteOutcome {
                    command: command.to_string(),
                    is_risky: false,
                })
            }
            Err(e) => {
                warn!(session = %session.id, error = %e, "Command channel failed");
                session.shell.dispatch_failed(ticket, &e.to_string())?;
                Err(match e {
                    SshRelayError::TransportClosure(_) => e,
                    other => SshRelayError::Channel(other.to_string()),
                })
            }
        }
    }

    /// Snapshot of the session's output. Never blocks on the remote and
    /// never mutates state.
    pub fn read_output(&self, id: &str, plain: bool) -> Result<OutputSnapshot> {
        self.session(id)?.shell.view(plain)
    }

    /// Write a line of input to the running command.
    pub async fn write_input(&self, id: &str, text: &str) -> Result<()> {
        let mut line = text.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.send_request(id, ChannelRequest::Data(line.into_bytes()))
            .await
    }

    /// Ask the running command to stop.
    ///
    /// Delivery is advisory: completion is still only observed through
    /// `read_output`.
    pub async fn send_signal(&self, id: &str, signal: Signal) -> Result<()> {
        let request = if self.options.native_signals {
            ChannelRequest::Signal(signal)
        } else {
            ChannelRequest::Data(signal.raw_sequence().to_vec())
        };
        debug!(session = %id, signal = %signal, "Sending signal");
        self.send_request(id, request).await
    }

    /// Write a raw Ctrl-C to the running command.
    pub async fn send_interrupt(&self, id: &str) -> Result<()> {
        self.send_request(id, ChannelRequest::Data(ETX.to_vec()))
            .await
    }

    async fn send_request(&self, id: &str, request: ChannelRequest) -> Result<()> {
        let session = self.session(id)?;
        let sender = session.shell.request_sender()?;
        sender
            .send(request)
            .await
            .map_err(|_| SshRelayError::Channel("command channel already closed".into()))
    }

    /// Close the session's connection and forget it. Unknown ids are a
    /// no-op.
    pub async fn disconnect(&self, id: &str) -> Result<()> {
        let Ok(parsed) = id.parse::<SessionId>() else {
            return Ok(());
        };
        let session = match self.registry.lookup(&parsed) {
            Ok(session) => session,
            Err(SshRelayError::SessionNotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        session.shutdown().await;
        self.registry.release(&parsed)?;
        info!(session = %id, "Session disconnected");
        Ok(())
    }

    /// Disconnect every live session. Returns how many were closed.
    pub async fn disconnect_all(&self) -> usize {
        let sessions = match self.registry.drain() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(error = %e, "Could not drain registry");
                return 0;
            }
        };
        let count = sessions.len();
        for session in sessions {
            session.shutdown().await;
        }
        if count > 0 {
            info!(count, "All sessions disconnected");
        }
        count
    }

    /// Summaries of every live session.
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries: Vec<SessionSummary> = self
            .registry
            .list()?
            .iter()
            .map(|session| session.summary())
            .collect();
        summaries.sort_by_key(|s| s.connected_at);
        Ok(summaries)
    }
}

/// Undoes a connect whose future was dropped before it finished.
///
/// Until [`PendingConnect::complete`] runs, dropping this releases the
/// reserved identifier and shuts down the session, if one was built.
struct PendingConnect {
    registry: Arc<ConnectionRegistry>,
    id: SessionId,
    session: Option<Arc<Session>>,
    done: bool,
}

impl PendingConnect {
    fn complete(&mut self) {
        self.done = true;
    }
}

impl Drop for PendingConnect {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Err(e) = self.registry.release(&self.id) {
            warn!(session = %self.id, error = %e, "Failed to release session");
        }
        let Some(session) = self.session.take() else {
            return;
        };
        warn!(session = %self.id, "Connect abandoned; closing connection");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { session.shutdown().await });
        }
    }
}

/// Feed one command channel into the session buffer until it closes.
async fn pump_output(
    session: Arc<Session>,
    ticket: Dispatch,
    mut events: mpsc::Receiver<ChannelEvent>,
) {
    while let Some(event) = events.recv().await {
        let applied = match event {
            ChannelEvent::Stdout(bytes) => session.shell.append(ticket, &bytes, false),
            ChannelEvent::Stderr(bytes) => session.shell.append(ticket, &bytes, true),
            ChannelEvent::ExitStatus(code) => session.shell.record_exit(ticket, code),
            ChannelEvent::Closed => break,
        };
        if let Err(e) = applied {
            warn!(session = %session.id, error = %e, "Dropping command output");
            break;
        }
    }

    if let Err(e) = session.shell.finish(ticket) {
        warn!(session = %session.id, error = %e, "Failed to finish command");
    }
}
