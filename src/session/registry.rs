//! Connection registry: session identifiers to live sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, info};

use super::{ShellBridge, ShellState, SessionId};
use crate::error::SshRelayError;
use crate::transport::{ChannelRequest, Transport};
use crate::Result;

/// Where a session was connected and as whom.
#[derive(Debug)]
pub struct SessionInfo {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub connected_at: SystemTime,
    os_info: OnceLock<String>,
}

impl SessionInfo {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            connected_at: SystemTime::now(),
            os_info: OnceLock::new(),
        }
    }

    /// OS descriptor from the post-connect probe; empty until probed.
    pub fn os_info(&self) -> &str {
        self.os_info.get().map(String::as_str).unwrap_or("")
    }

    pub(crate) fn set_os_info(&self, info: String) {
        let _ = self.os_info.set(info);
    }
}

/// One authenticated connection plus its interactive command state.
pub struct Session {
    pub id: SessionId,
    pub info: SessionInfo,
    pub shell: ShellBridge,
    transport: Arc<dyn Transport>,
    closed: AtomicBool,
}

impl Session {
    pub fn new(id: SessionId, info: SessionInfo, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            info,
            shell: ShellBridge::new(),
            transport,
            closed: AtomicBool::new(false),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the running command's channel, then the connection.
    ///
    /// Only the first call does anything.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(Some(channel)) = self.shell.terminate() {
            let _ = channel.try_send(ChannelRequest::Close);
        }
        self.transport.close().await;
        info!(session = %self.id, host = %self.info.host, "Session closed");
    }

    /// Summary for listings.
    pub fn summary(&self) -> SessionSummary {
        let state = self.shell.state().unwrap_or(ShellState::Terminating);
        SessionSummary {
            session_id: self.id.to_string(),
            host: self.info.host.clone(),
            port: self.info.port,
            username: self.info.username.clone(),
            os_info: self.info.os_info().to_string(),
            state: format!("{:?}", state).to_lowercase(),
            connected_at: self
                .info
                .connected_at
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// Serializable description of a live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub os_info: String,
    pub state: String,
    /// Seconds since the Unix epoch.
    pub connected_at: u64,
}

enum Slot {
    /// Allocated, authentication still in progress.
    Reserved,
    Live(Arc<Session>),
}

/// Thread-safe table of sessions.
///
/// Identifiers are reserved before authentication and only resolve once
/// the session is registered. Each registry is independent.
#[derive(Default)]
pub struct ConnectionRegistry {
    slots: RwLock<HashMap<SessionId, Slot>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh identifier.
    pub fn allocate(&self) -> Result<SessionId> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| SshRelayError::LockPoisoned)?;
        let mut id = SessionId::new();
        while slots.contains_key(&id) {
            id = SessionId::new();
        }
        slots.insert(id, Slot::Reserved);
        debug!(session = %id, "Session id reserved");
        Ok(id)
    }

    /// Make a reserved identifier resolvable.
    ///
    /// Fails with `SessionNotFound` if the reservation was released in the
    /// meantime.
    pub fn register(&self, session: Arc<Session>) -> Result<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| SshRelayError::LockPoisoned)?;
        match slots.get_mut(&session.id) {
            Some(slot @ Slot::Reserved) => {
                *slot = Slot::Live(session);
                Ok(())
            }
            Some(Slot::Live(_)) => Err(SshRelayError::InvalidInput(format!(
                "session {} is already registered",
                session.id
            ))),
            None => Err(SshRelayError::SessionNotFound(session.id.to_string())),
        }
    }

    /// Resolve a live session.
    pub fn lookup(&self, id: &SessionId) -> Result<Arc<Session>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| SshRelayError::LockPoisoned)?;
        match slots.get(id) {
            Some(Slot::Live(session)) => Ok(session.clone()),
            _ => Err(SshRelayError::SessionNotFound(id.to_string())),
        }
    }

    /// Resolve a live session from its external string form.
    pub fn lookup_str(&self, id: &str) -> Result<Arc<Session>> {
        self.lookup(&id.parse()?)
    }

    /// Remove an entry. Releasing an unknown id is a no-op.
    pub fn release(&self, id: &SessionId) -> Result<Option<Arc<Session>>> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| SshRelayError::LockPoisoned)?;
        Ok(match slots.remove(id) {
            Some(Slot::Live(session)) => {
                debug!(session = %id, "Session released");
                Some(session)
            }
            _ => None,
        })
    }

    /// Number of live sessions.
    pub fn count(&self) -> Result<usize> {
        let slots = self
            .slots
            .read()
            .map_err(|_| SshRelayError::LockPoisoned)?;
        Ok(slots
            .values()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count())
    }

    /// Every live session.
    pub fn list(&self) -> Result<Vec<Arc<Session>>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| SshRelayError::LockPoisoned)?;
        Ok(slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Live(session) => Some(session.clone()),
                Slot::Reserved => None,
            })
            .collect())
    }

    /// Remove every live session and hand them back.
    pub fn drain(&self) -> Result<Vec<Arc<Session>>> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| SshRelayError::LockPoisoned)?;
        let live: Vec<SessionId> = slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Live(_)))
            .map(|(id, _)| *id)
            .collect();
        Ok(live
            .into_iter()
            .filter_map(|id| match slots.remove(&id) {
                Some(Slot::Live(session)) => Some(session),
                _ => None,
            })
            .collect())
    }
}
