//! Secure transport abstraction.
//!
//! A [`Connector`] authenticates against a remote host and yields a
//! [`Transport`], one authenticated connection that can multiplex any number
//! of command channels and file-transfer channels. The production
//! implementation speaks SSH via `russh`. The `memory` module, built for
//! unit tests and behind the `test-util` feature, provides a scripted
//! in-process remote.

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
mod sftp;
mod ssh;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SshRelayError;
use crate::Result;

pub use ssh::{SshConnector, SshSettings};

/// Queue depth between a channel pump and its consumer.
pub(crate) const CHANNEL_BUFFER: usize = 256;

/// How a session authenticates.
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum AuthMethod {
    /// Password authentication.
    Password { password: String },
    /// Private key in PEM or OpenSSH text form.
    PrivateKey {
        private_key: String,
        #[serde(default)]
        passphrase: Option<String>,
    },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password { .. } => f.write_str("Password(..)"),
            Self::PrivateKey { .. } => f.write_str("PrivateKey(..)"),
        }
    }
}

/// Everything needed to open one session.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    pub username: String,
    #[serde(flatten)]
    pub auth: AuthMethod,
    /// Expected SHA-256 host key fingerprint (`SHA256:...`).
    #[serde(default)]
    pub host_fingerprint: Option<String>,
}

fn default_ssh_port() -> u16 {
    22
}

impl Credentials {
    /// Password credentials for `username@host:port`.
    pub fn password(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            auth: AuthMethod::Password {
                password: password.into(),
            },
            host_fingerprint: None,
        }
    }

    /// Pin the expected host key fingerprint.
    pub fn with_host_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.host_fingerprint = Some(fingerprint.into());
        self
    }
}

/// Pseudo-terminal parameters for a command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyRequest {
    pub term: String,
    pub cols: u32,
    pub rows: u32,
}

impl Default for PtyRequest {
    fn default() -> Self {
        Self {
            term: "xterm-256color".into(),
            cols: 120,
            rows: 40,
        }
    }
}

/// Signals a caller may deliver to a running command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Int,
    Term,
    Kill,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Term => "TERM",
            Self::Kill => "KILL",
        }
    }

    /// Terminal control bytes standing in for this signal when the channel
    /// cannot deliver it natively.
    pub fn raw_sequence(&self) -> &'static [u8] {
        match self {
            Self::Int | Self::Term => b"\x03",
            Self::Kill => b"\x1c",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = SshRelayError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("SIG").unwrap_or(&upper) {
            "INT" => Ok(Self::Int),
            "TERM" => Ok(Self::Term),
            "KILL" => Ok(Self::Kill),
            _ => Err(SshRelayError::InvalidInput(format!("unknown signal: {s}"))),
        }
    }
}

impl<'de> Deserialize<'de> for Signal {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Something a command channel reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Bytes on the primary stream.
    Stdout(Vec<u8>),
    /// Bytes on the diagnostic stream.
    Stderr(Vec<u8>),
    /// The remote process exited with this status.
    ExitStatus(u32),
    /// The channel is gone. Always the last event.
    Closed,
}

/// Something to send down a command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRequest {
    Data(Vec<u8>),
    Signal(Signal),
    Close,
}

/// An open command channel, as a pair of queues.
///
/// Events arrive in the order the remote delivered them. Dropping
/// `requests` closes the channel.
pub struct CommandChannel {
    pub events: mpsc::Receiver<ChannelEvent>,
    pub requests: mpsc::Sender<ChannelRequest>,
}

/// One directory item as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    /// Seconds since the Unix epoch, when the server reports it.
    pub modified: Option<u64>,
}

/// Opens authenticated transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Authenticate and return the live connection.
    ///
    /// Fails with `Auth` for rejected credentials or host keys and with
    /// `Transport` when the host cannot be reached.
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn Transport>>;
}

/// One authenticated connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a session channel, optionally with a PTY, and exec `command`.
    async fn open_command(&self, command: &str, pty: Option<&PtyRequest>)
        -> Result<CommandChannel>;

    /// Open a fresh file-transfer channel.
    async fn open_file_transfer(&self) -> Result<Box<dyn FileTransfer>>;

    /// Resolve once the connection is gone, for whatever reason.
    async fn wait_closed(&self);

    /// Disconnect. Calling this more than once is harmless.
    async fn close(&self);
}

/// A transient file-transfer channel. Errors are `Transfer`.
#[async_trait]
pub trait FileTransfer: Send + Sync {
    async fn read_dir(&self, path: &str) -> Result<Vec<FileEntry>>;
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
    async fn remove_file(&self, path: &str) -> Result<()>;
    /// Remove an empty directory.
    async fn remove_dir(&self, path: &str) -> Result<()>;
    /// Whether `path` is a directory (symlinks are not followed).
    async fn is_dir(&self, path: &str) -> Result<bool>;
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Run `command` without a PTY and collect its primary output.
///
/// Used for one-shot diagnostic commands that must not touch the
/// interactive channel. Fails with `Channel` if it does not finish within
/// `limit`.
pub async fn capture(transport: &dyn Transport, command: &str, limit: Duration) -> Result<String> {
    let CommandChannel {
        mut events,
        requests,
    } = transport.open_command(command, None).await?;

    let collect = async {
        let mut stdout = Vec::new();
        while let Some(event) = events.recv().await {
            match event {
                ChannelEvent::Stdout(bytes) => stdout.extend_from_slice(&bytes),
                ChannelEvent::Closed => break,
                ChannelEvent::Stderr(_) | ChannelEvent::ExitStatus(_) => {}
            }
        }
        stdout
    };

    let result = tokio::time::timeout(limit, collect).await;
    let _ = requests.send(ChannelRequest::Close).await;

    match result {
        Ok(stdout) => Ok(String::from_utf8_lossy(&stdout).into_owned()),
        Err(_) => Err(SshRelayError::Channel(format!(
            "'{command}' did not finish within {}s",
            limit.as_secs()
        ))),
    }
}
