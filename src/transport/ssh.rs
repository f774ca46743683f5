//! SSH transport over `russh`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::{HashAlg, PublicKey};
use russh::{Channel, ChannelMsg, Disconnect, Sig};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use super::sftp::SftpTransfer;
use super::{
    AuthMethod, ChannelEvent, ChannelRequest, CommandChannel, Connector, Credentials,
    FileTransfer, PtyRequest, Signal, Transport, CHANNEL_BUFFER,
};
use crate::error::SshRelayError;
use crate::Result;

const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection tuning for [`SshConnector`].
#[derive(Debug, Clone)]
pub struct SshSettings {
    pub connect_timeout: Duration,
    pub keepalive_interval: Duration,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(30),
        }
    }
}

/// Opens authenticated SSH connections.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    settings: SshSettings,
}

impl SshConnector {
    pub fn new(settings: SshSettings) -> Self {
        Self { settings }
    }
}

/// Host-key policy and closure notification for one connection.
struct ClientHandler {
    host: String,
    pinned: Option<String>,
    closed: watch::Sender<bool>,
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256).to_string();
        match &self.pinned {
            Some(expected) if *expected != fingerprint => {
                warn!(
                    host = %self.host,
                    expected = %expected,
                    actual = %fingerprint,
                    "Host key does not match pinned fingerprint"
                );
                Ok(false)
            }
            Some(_) => Ok(true),
            None => {
                info!(host = %self.host, fingerprint = %fingerprint, "Accepting host key");
                Ok(true)
            }
        }
    }
}

impl Drop for ClientHandler {
    fn drop(&mut self) {
        // The handler lives as long as the connection task
        self.closed.send_replace(true);
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn Transport>> {
        let target = format!("{}:{}", credentials.host, credentials.port);
        info!(target = %target, user = %credentials.username, "Connecting");

        let config = client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(self.settings.keepalive_interval),
            keepalive_max: 3,
            ..Default::default()
        };

        let (closed, closed_rx) = watch::channel(false);
        let handler = ClientHandler {
            host: credentials.host.clone(),
            pinned: credentials.host_fingerprint.clone(),
            closed,
        };

        let mut handle = tokio::time::timeout(
            self.settings.connect_timeout,
            client::connect(
                Arc::new(config),
                (credentials.host.as_str(), credentials.port),
                handler,
            ),
        )
        .await
        .map_err(|_| {
            SshRelayError::Transport(format!(
                "connection to {target} timed out after {}s",
                self.settings.connect_timeout.as_secs()
            ))
        })?
        .map_err(|e| match e {
            russh::Error::UnknownKey => {
                SshRelayError::Auth(format!("host key for {target} was rejected"))
            }
            other => SshRelayError::Transport(format!("{target}: {other}")),
        })?;

        debug!(target = %target, "Handshake complete");

        let outcome = match &credentials.auth {
            AuthMethod::Password { password } => handle
                .authenticate_password(&credentials.username, password)
                .await
                .map_err(|e| SshRelayError::Auth(e.to_string()))?,
            AuthMethod::PrivateKey {
                private_key,
                passphrase,
            } => {
                let key = russh::keys::decode_secret_key(private_key, passphrase.as_deref())
                    .map_err(|e| SshRelayError::Auth(format!("unusable private key: {e}")))?;
                let hash_alg = handle
                    .best_supported_rsa_hash()
                    .await
                    .ok()
                    .flatten()
                    .flatten();
                handle
                    .authenticate_publickey(
                        &credentials.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(|e| SshRelayError::Auth(e.to_string()))?
            }
        };

        if !outcome.success() {
            return Err(SshRelayError::Auth(format!(
                "{}@{target}: credentials rejected",
                credentials.username
            )));
        }

        info!(target = %target, user = %credentials.username, "Authenticated");

        Ok(Arc::new(SshTransport {
            target,
            handle,
            closed: closed_rx,
        }))
    }
}

struct SshTransport {
    target: String,
    handle: Handle<ClientHandler>,
    closed: watch::Receiver<bool>,
}

impl SshTransport {
    async fn open_channel(&self) -> Result<Channel<Msg>> {
        if self.handle.is_closed() {
            return Err(SshRelayError::TransportClosure(format!(
                "{} is disconnected",
                self.target
            )));
        }
        self.handle
            .channel_open_session()
            .await
            .map_err(|e| SshRelayError::Channel(format!("open session channel: {e}")))
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn open_command(
        &self,
        command: &str,
        pty: Option<&PtyRequest>,
    ) -> Result<CommandChannel> {
        let channel = self.open_channel().await?;

        if let Some(pty) = pty {
            channel
                .request_pty(false, &pty.term, pty.cols, pty.rows, 0, 0, &[])
                .await
                .map_err(|e| SshRelayError::Channel(format!("PTY request failed: {e}")))?;
        }

        channel
            .exec(true, command)
            .await
            .map_err(|e| SshRelayError::Channel(format!("exec failed: {e}")))?;

        let (event_tx, events) = mpsc::channel(CHANNEL_BUFFER);
        let (requests, request_rx) = mpsc::channel(CHANNEL_BUFFER);
        tokio::spawn(pump(channel, event_tx, request_rx));

        Ok(CommandChannel { events, requests })
    }

    async fn open_file_transfer(&self) -> Result<Box<dyn FileTransfer>> {
        let channel = self.open_channel().await?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| SshRelayError::Transfer(format!("SFTP subsystem unavailable: {e}")))?;
        let sftp = russh_sftp::client::SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SshRelayError::Transfer(format!("SFTP handshake failed: {e}")))?;
        Ok(Box::new(SftpTransfer::new(sftp)))
    }

    async fn wait_closed(&self) {
        let mut closed = self.closed.clone();
        // Err means the handler was dropped, which is closure too
        let _ = closed.wait_for(|c| *c).await;
    }

    async fn close(&self) {
        if self.handle.is_closed() {
            return;
        }
        match tokio::time::timeout(
            DISCONNECT_TIMEOUT,
            self.handle.disconnect(Disconnect::ByApplication, "", "en"),
        )
        .await
        {
            Ok(Ok(())) => debug!(target = %self.target, "Disconnected"),
            Ok(Err(e)) => debug!(target = %self.target, error = %e, "Disconnect failed"),
            Err(_) => warn!(target = %self.target, "Timed out sending disconnect"),
        }
    }
}

fn native_signal(signal: Signal) -> Sig {
    match signal {
        Signal::Int => Sig::INT,
        Signal::Term => Sig::TERM,
        Signal::Kill => Sig::KILL,
    }
}

/// Bridge one russh channel onto the event/request queues.
async fn pump(
    mut channel: Channel<Msg>,
    events: mpsc::Sender<ChannelEvent>,
    mut requests: mpsc::Receiver<ChannelRequest>,
) {
    loop {
        tokio::select! {
            request = requests.recv() => match request {
                Some(ChannelRequest::Data(bytes)) => {
                    trace!(len = bytes.len(), "Channel input");
                    if let Err(e) = channel.data(&bytes[..]).await {
                        warn!(error = %e, "Failed to write to channel");
                        break;
                    }
                }
                Some(ChannelRequest::Signal(signal)) => {
                    if let Err(e) = channel.signal(native_signal(signal)).await {
                        debug!(error = %e, signal = %signal, "Signal delivery failed");
                    }
                }
                Some(ChannelRequest::Close) | None => {
                    let _ = channel.eof().await;
                    let _ = channel.close().await;
                    break;
                }
            },
            msg = channel.wait() => {
                let event = match msg {
                    Some(ChannelMsg::Data { data }) => ChannelEvent::Stdout(data.to_vec()),
                    Some(ChannelMsg::ExtendedData { data, ext: 1 }) => {
                        ChannelEvent::Stderr(data.to_vec())
                    }
                    Some(ChannelMsg::ExitStatus { exit_status }) => {
                        ChannelEvent::ExitStatus(exit_status)
                    }
                    Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                        debug!(signal = ?signal_name, "Remote process killed by signal");
                        continue;
                    }
                    Some(ChannelMsg::Close) | None => break,
                    Some(_) => continue,
                };
                if events.send(event).await.is_err() {
                    let _ = channel.close().await;
                    break;
                }
            }
        }
    }

    let _ = events.send(ChannelEvent::Closed).await;
}
