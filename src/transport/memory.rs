//! In-process stand-in for a remote SSH host.
//!
//! [`MemoryRemote`] scripts a handful of shell commands and keeps a small
//! in-memory filesystem so the session manager and HTTP layer can be driven
//! end to end without a network. Every connection opened through
//! [`MemoryConnector`] shares the same remote state.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::{
    AuthMethod, ChannelEvent, ChannelRequest, CommandChannel, Connector, Credentials, FileEntry,
    FileTransfer, PtyRequest, Signal, Transport, CHANNEL_BUFFER,
};
use crate::error::SshRelayError;
use crate::Result;

/// Fingerprint the in-memory host presents.
pub const HOST_FINGERPRINT: &str = "SHA256:bWVtb3J5LXJlbW90ZS1ob3N0LWtleS1maW5nZXJwcmludA";

/// Modification time reported for every in-memory file.
const MTIME: u64 = 1_700_000_000;

const DEFAULT_OS_RELEASE: &str = "PRETTY_NAME=\"Ubuntu 22.04.4 LTS\"\n\
NAME=\"Ubuntu\"\n\
VERSION_ID=\"22.04\"\n\
ID=ubuntu\n\
ID_LIKE=debian\n";

/// Canned output for the system statistics command.
pub const STATS_OUTPUT: &str = "\
top - 10:15:01 up 3 days,  2:11,  1 user,  load average: 0.08, 0.03, 0.01
Tasks: 112 total,   1 running, 111 sleeping,   0 stopped,   0 zombie
%Cpu(s):  3.1 us,  1.6 sy,  0.0 ni, 95.3 id,  0.0 wa,  0.0 hi,  0.0 si,  0.0 st
MiB Mem :   3936.2 total,    512.4 free,   1210.7 used,   2213.1 buff/cache
MiB Swap:      0.0 total,      0.0 free,      0.0 used.   2450.3 avail Mem

    PID USER      PR  NI    VIRT    RES    SHR S  %CPU  %MEM     TIME+ COMMAND
      1 root      20   0  167744  11520   8320 S   0.0   0.3   0:04.12 systemd
Filesystem     1G-blocks  Used Available Use% Mounted on
/dev/root            29G    7G       22G  25% /
               total        used        free      shared  buff/cache   available
Mem:            3936        1210         512          12        2213        2450
Swap:              0           0           0
";

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

struct Remote {
    password: Mutex<Option<String>>,
    os_release: Mutex<Option<String>>,
    refuse: AtomicBool,
    fail_channels: AtomicBool,
    stall_channels: AtomicBool,
    files: Mutex<BTreeMap<String, Node>>,
    inputs: Mutex<Vec<Vec<u8>>>,
    signals: Mutex<Vec<Signal>>,
    commands: Mutex<Vec<String>>,
    connections: Mutex<Vec<watch::Sender<bool>>>,
    connects: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return "/".into();
    }
    let body = trimmed.trim_end_matches('/');
    if body.starts_with('/') {
        body.to_string()
    } else {
        format!("/{body}")
    }
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rsplit_once('/') {
        Some(("", _)) => Some("/"),
        Some((parent, _)) => Some(parent),
        None => None,
    }
}

fn is_within(path: &str, root: &str) -> bool {
    path == root || root == "/" || path.starts_with(&format!("{root}/"))
}

/// Handle to a scripted remote host. Clones share state.
#[derive(Clone)]
pub struct MemoryRemote {
    inner: Arc<Remote>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// A remote with `/`, `/home`, `/tmp` and an Ubuntu os-release file.
    /// Any password is accepted until [`MemoryRemote::with_password`].
    pub fn new() -> Self {
        let mut files = BTreeMap::new();
        files.insert("/".to_string(), Node::Dir);
        files.insert("/home".to_string(), Node::Dir);
        files.insert("/tmp".to_string(), Node::Dir);

        Self {
            inner: Arc::new(Remote {
                password: Mutex::new(None),
                os_release: Mutex::new(Some(DEFAULT_OS_RELEASE.to_string())),
                refuse: AtomicBool::new(false),
                fail_channels: AtomicBool::new(false),
                stall_channels: AtomicBool::new(false),
                files: Mutex::new(files),
                inputs: Mutex::new(Vec::new()),
                signals: Mutex::new(Vec::new()),
                commands: Mutex::new(Vec::new()),
                connections: Mutex::new(Vec::new()),
                connects: AtomicUsize::new(0),
            }),
        }
    }

    /// Only accept this password.
    pub fn with_password(self, password: impl Into<String>) -> Self {
        *lock(&self.inner.password) = Some(password.into());
        self
    }

    /// Make `/etc/os-release` unreadable.
    pub fn without_os_release(self) -> Self {
        *lock(&self.inner.os_release) = None;
        self
    }

    /// A connector that opens connections to this remote.
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            remote: self.clone(),
        }
    }

    /// An already-authenticated connection, bypassing credential checks.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(self.open_connection())
    }

    fn open_connection(&self) -> MemoryTransport {
        let (closed, _) = watch::channel(false);
        lock(&self.inner.connections).push(closed.clone());
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        MemoryTransport {
            remote: self.inner.clone(),
            closed,
        }
    }

    /// Refuse new connections at the network level.
    pub fn refuse_connections(&self, refuse: bool) {
        self.inner.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Reject every channel open request.
    pub fn fail_channels(&self, fail: bool) {
        self.inner.fail_channels.store(fail, Ordering::SeqCst);
    }

    /// Hold every command channel open request until unset.
    pub fn stall_channels(&self, stall: bool) {
        self.inner.stall_channels.store(stall, Ordering::SeqCst);
    }

    /// Drop every open connection from the remote side.
    pub fn close_remote(&self) {
        for conn in lock(&self.inner.connections).iter() {
            conn.send_replace(true);
        }
    }

    /// Number of connections opened so far.
    pub fn connection_count(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    /// Connections not yet closed by either side.
    pub fn open_connections(&self) -> usize {
        lock(&self.inner.connections)
            .iter()
            .filter(|closed| !*closed.borrow())
            .count()
    }

    /// Create a directory (parents are not created).
    pub fn mkdir(&self, path: &str) {
        lock(&self.inner.files).insert(normalize(path), Node::Dir);
    }

    /// Create or replace a file.
    pub fn put_file(&self, path: &str, contents: impl Into<Vec<u8>>) {
        lock(&self.inner.files).insert(normalize(path), Node::File(contents.into()));
    }

    /// Contents of a file, if it exists.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match lock(&self.inner.files).get(&normalize(path)) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Whether anything exists at `path`.
    pub fn exists(&self, path: &str) -> bool {
        lock(&self.inner.files).contains_key(&normalize(path))
    }

    /// Every chunk written to a command's stdin, in order.
    pub fn inputs(&self) -> Vec<Vec<u8>> {
        lock(&self.inner.inputs).clone()
    }

    /// Every natively delivered signal, in order.
    pub fn signals(&self) -> Vec<Signal> {
        lock(&self.inner.signals).clone()
    }

    /// Every command exec'd, in order.
    pub fn commands(&self) -> Vec<String> {
        lock(&self.inner.commands).clone()
    }
}

/// [`Connector`] for a [`MemoryRemote`].
#[derive(Clone)]
pub struct MemoryConnector {
    remote: MemoryRemote,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn Transport>> {
        let inner = &self.remote.inner;
        if inner.refuse.load(Ordering::SeqCst) {
            return Err(SshRelayError::Transport(format!(
                "connect to {}:{}: connection refused",
                credentials.host, credentials.port
            )));
        }

        if let Some(expected) = &credentials.host_fingerprint {
            if expected != HOST_FINGERPRINT {
                return Err(SshRelayError::Auth(format!(
                    "host key for {} does not match pinned fingerprint",
                    credentials.host
                )));
            }
        }

        let accepted = lock(&inner.password).clone();
        match (&credentials.auth, accepted) {
            (AuthMethod::Password { password }, Some(expected)) if *password != expected => {
                return Err(SshRelayError::Auth("permission denied (password)".into()));
            }
            (AuthMethod::PrivateKey { .. }, Some(_)) => {
                return Err(SshRelayError::Auth("permission denied (publickey)".into()));
            }
            _ => {}
        }

        Ok(Arc::new(self.remote.open_connection()))
    }
}

struct MemoryTransport {
    remote: Arc<Remote>,
    closed: watch::Sender<bool>,
}

impl MemoryTransport {
    fn ensure_open(&self) -> Result<()> {
        if *self.closed.borrow() {
            return Err(SshRelayError::TransportClosure("connection closed".into()));
        }
        if self.remote.fail_channels.load(Ordering::SeqCst) {
            return Err(SshRelayError::Channel(
                "channel open failed: administratively prohibited".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open_command(
        &self,
        command: &str,
        pty: Option<&PtyRequest>,
    ) -> Result<CommandChannel> {
        self.ensure_open()?;
        while self.remote.stall_channels.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        lock(&self.remote.commands).push(command.to_string());

        let (event_tx, events) = mpsc::channel(CHANNEL_BUFFER);
        let (requests, request_rx) = mpsc::channel(CHANNEL_BUFFER);
        let script = Script {
            remote: self.remote.clone(),
            command: command.trim().to_string(),
            eol: if pty.is_some() { "\r\n" } else { "\n" },
            pty: pty.is_some(),
            events: event_tx,
            requests: request_rx,
            closed: self.closed.subscribe(),
        };
        tokio::spawn(script.run());

        Ok(CommandChannel { events, requests })
    }

    async fn open_file_transfer(&self) -> Result<Box<dyn FileTransfer>> {
        self.ensure_open()?;
        Ok(Box::new(MemoryTransfer {
            remote: self.remote.clone(),
        }))
    }

    async fn wait_closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    async fn close(&self) {
        self.closed.send_replace(true);
    }
}

/// One scripted command execution.
struct Script {
    remote: Arc<Remote>,
    command: String,
    eol: &'static str,
    /// A PTY merges the diagnostic stream into stdout.
    pty: bool,
    events: mpsc::Sender<ChannelEvent>,
    requests: mpsc::Receiver<ChannelRequest>,
    closed: watch::Receiver<bool>,
}

impl Script {
    async fn emit(&self, event: ChannelEvent) {
        let _ = self.events.send(event).await;
    }

    async fn stdout(&self, text: &str) {
        self.emit(ChannelEvent::Stdout(text.as_bytes().to_vec())).await;
    }

    async fn stderr(&self, text: &str) {
        let bytes = text.as_bytes().to_vec();
        if self.pty {
            self.emit(ChannelEvent::Stdout(bytes)).await;
        } else {
            self.emit(ChannelEvent::Stderr(bytes)).await;
        }
    }

    async fn run(mut self) {
        debug!(command = %self.command, "memory remote exec");
        let status = self.execute().await;
        if let Some(code) = status {
            self.emit(ChannelEvent::ExitStatus(code)).await;
        }
        self.emit(ChannelEvent::Closed).await;
    }

    async fn execute(&mut self) -> Option<u32> {
        let command = self.command.clone();
        let (program, args) = command
            .split_once(char::is_whitespace)
            .map(|(p, a)| (p, a.trim()))
            .unwrap_or((command.as_str(), ""));
        let eol = self.eol;

        if command == crate::stats::STATS_COMMAND {
            self.stdout(&STATS_OUTPUT.replace('\n', eol)).await;
            return Some(0);
        }

        match (program, args) {
            ("cat", "/etc/os-release") => {
                let release = lock(&self.remote.os_release).clone();
                match release {
                    Some(text) => {
                        self.stdout(&text.replace('\n', eol)).await;
                        Some(0)
                    }
                    None => {
                        self.stderr(&format!(
                            "cat: /etc/os-release: No such file or directory{eol}"
                        ))
                        .await;
                        Some(1)
                    }
                }
            }
            ("echo", text) => {
                self.stdout(&format!("{text}{eol}")).await;
                Some(0)
            }
            ("ls", path) => self.list(path).await,
            ("rm", args) if args.starts_with("-rf ") || args.starts_with("-fr ") => {
                let target = normalize(&args[4..]);
                lock(&self.remote.files).retain(|p, _| p == "/" || !is_within(p, &target));
                Some(0)
            }
            ("false", _) => Some(1),
            ("grep", _) => Some(1),
            ("sleep", _) | ("cat", "") | ("tail", _) => self.interactive(program == "cat").await,
            _ => {
                self.stderr(&format!("sh: 1: {program}: not found{eol}"))
                    .await;
                Some(127)
            }
        }
    }

    async fn list(&self, path: &str) -> Option<u32> {
        let target = normalize(path);
        let names: Option<Vec<String>> = {
            let files = lock(&self.remote.files);
            match files.get(&target) {
                Some(Node::Dir) => Some(
                    files
                        .keys()
                        .filter(|p| parent_of(p) == Some(target.as_str()))
                        .filter_map(|p| p.rsplit('/').next().map(str::to_string))
                        .collect(),
                ),
                Some(Node::File(_)) => Some(vec![target.clone()]),
                None => None,
            }
        };

        match names {
            Some(names) => {
                if !names.is_empty() {
                    self.stdout(&format!("{}{}", names.join("  "), self.eol))
                        .await;
                }
                Some(0)
            }
            None => {
                self.stderr(&format!(
                    "ls: cannot access '{path}': No such file or directory{}",
                    self.eol
                ))
                .await;
                Some(2)
            }
        }
    }

    /// Long-running command: consumes input until interrupted.
    async fn interactive(&mut self, echo: bool) -> Option<u32> {
        loop {
            tokio::select! {
                request = self.requests.recv() => match request {
                    Some(ChannelRequest::Data(bytes)) => {
                        lock(&self.remote.inputs).push(bytes.clone());
                        if bytes.contains(&0x03) || bytes.contains(&0x1c) {
                            self.stdout(&format!("^C{}", self.eol)).await;
                            return Some(130);
                        }
                        if echo {
                            let text = String::from_utf8_lossy(&bytes)
                                .replace('\n', self.eol);
                            self.stdout(&text).await;
                        }
                    }
                    Some(ChannelRequest::Signal(signal)) => {
                        lock(&self.remote.signals).push(signal);
                        return Some(match signal {
                            Signal::Int => 130,
                            Signal::Term => 143,
                            Signal::Kill => 137,
                        });
                    }
                    Some(ChannelRequest::Close) | None => return None,
                },
                _ = async { let _ = self.closed.wait_for(|closed| *closed).await; } => return None,
                _ = tokio::time::sleep(Duration::from_secs(3600)) => return Some(0),
            }
        }
    }
}

struct MemoryTransfer {
    remote: Arc<Remote>,
}

fn missing(path: &str) -> SshRelayError {
    SshRelayError::Transfer(format!("{path}: no such file"))
}

#[async_trait]
impl FileTransfer for MemoryTransfer {
    async fn read_dir(&self, path: &str) -> Result<Vec<FileEntry>> {
        let target = normalize(path);
        let files = lock(&self.remote.files);
        match files.get(&target) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(SshRelayError::Transfer(format!("{path}: not a directory")))
            }
            None => return Err(missing(path)),
        }

        Ok(files
            .iter()
            .filter(|(p, _)| parent_of(p) == Some(target.as_str()))
            .map(|(p, node)| FileEntry {
                name: p.rsplit('/').next().unwrap_or_default().to_string(),
                is_directory: matches!(node, Node::Dir),
                size: match node {
                    Node::File(data) => data.len() as u64,
                    Node::Dir => 4096,
                },
                modified: Some(MTIME),
            })
            .collect())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        match lock(&self.remote.files).get(&normalize(path)) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir) => Err(SshRelayError::Transfer(format!("{path}: is a directory"))),
            None => Err(missing(path)),
        }
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = normalize(path);
        let mut files = lock(&self.remote.files);
        let parent_is_dir = parent_of(&target)
            .map(|p| matches!(files.get(p), Some(Node::Dir)))
            .unwrap_or(false);
        if !parent_is_dir {
            return Err(missing(path));
        }
        if matches!(files.get(&target), Some(Node::Dir)) {
            return Err(SshRelayError::Transfer(format!("{path}: is a directory")));
        }
        files.insert(target, Node::File(data.to_vec()));
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let (from, to) = (normalize(from), normalize(to));
        let mut files = lock(&self.remote.files);
        if !files.contains_key(&from) {
            return Err(missing(&from));
        }
        if files.contains_key(&to) {
            return Err(SshRelayError::Transfer(format!("{to}: already exists")));
        }

        let moved: Vec<String> = files
            .keys()
            .filter(|p| is_within(p, &from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(node) = files.remove(&old) {
                let new = format!("{to}{}", &old[from.len()..]);
                files.insert(new, node);
            }
        }
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let target = normalize(path);
        let mut files = lock(&self.remote.files);
        match files.get(&target) {
            Some(Node::File(_)) => {
                files.remove(&target);
                Ok(())
            }
            Some(Node::Dir) => Err(SshRelayError::Transfer(format!("{path}: is a directory"))),
            None => Err(missing(path)),
        }
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        let target = normalize(path);
        let mut files = lock(&self.remote.files);
        match files.get(&target) {
            Some(Node::Dir) => {
                if files.keys().any(|p| parent_of(p) == Some(target.as_str())) {
                    return Err(SshRelayError::Transfer(format!(
                        "{path}: directory not empty"
                    )));
                }
                files.remove(&target);
                Ok(())
            }
            Some(Node::File(_)) => {
                Err(SshRelayError::Transfer(format!("{path}: not a directory")))
            }
            None => Err(missing(path)),
        }
    }

    async fn is_dir(&self, path: &str) -> Result<bool> {
        match lock(&self.remote.files).get(&normalize(path)) {
            Some(node) => Ok(matches!(node, Node::Dir)),
            None => Err(missing(path)),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(mut channel: CommandChannel) -> Vec<ChannelEvent> {
        let mut seen = Vec::new();
        while let Some(event) = channel.events.recv().await {
            let done = event == ChannelEvent::Closed;
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/tmp/"), "/tmp");
        assert_eq!(normalize("tmp/a"), "/tmp/a");
        assert_eq!(parent_of("/tmp/a"), Some("/tmp"));
        assert_eq!(parent_of("/tmp"), Some("/"));
        assert_eq!(parent_of("/"), None);
    }

    #[tokio::test]
    async fn test_connector_checks_password() {
        let remote = MemoryRemote::new().with_password("secret");
        let connector = remote.connector();

        let bad = Credentials::password("h", 22, "u", "wrong");
        assert!(matches!(
            connector.connect(&bad).await,
            Err(SshRelayError::Auth(_))
        ));

        let good = Credentials::password("h", 22, "u", "secret");
        assert!(connector.connect(&good).await.is_ok());
        assert_eq!(remote.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_connector_checks_fingerprint() {
        let remote = MemoryRemote::new();
        let creds = Credentials::password("h", 22, "u", "pw").with_host_fingerprint("SHA256:nope");
        assert!(matches!(
            remote.connector().connect(&creds).await,
            Err(SshRelayError::Auth(_))
        ));

        let pinned = Credentials::password("h", 22, "u", "pw").with_host_fingerprint(HOST_FINGERPRINT);
        assert!(remote.connector().connect(&pinned).await.is_ok());
    }

    #[tokio::test]
    async fn test_ls_missing_reports_stderr() {
        let remote = MemoryRemote::new();
        let transport = remote.transport();
        let channel = transport
            .open_command("ls /nonexistent", None)
            .await
            .unwrap();
        let events = drain(channel).await;
        assert!(matches!(&events[0], ChannelEvent::Stderr(b) if String::from_utf8_lossy(b).contains("No such file")));
        assert_eq!(events[1], ChannelEvent::ExitStatus(2));
        assert_eq!(events[2], ChannelEvent::Closed);
    }

    #[tokio::test]
    async fn test_pty_merges_stderr_into_stdout() {
        let remote = MemoryRemote::new();
        let transport = remote.transport();
        let channel = transport
            .open_command("ls /nonexistent", Some(&PtyRequest::default()))
            .await
            .unwrap();
        let events = drain(channel).await;
        assert!(matches!(&events[0], ChannelEvent::Stdout(b) if String::from_utf8_lossy(b).contains("No such file")));
        assert!(!events.iter().any(|e| matches!(e, ChannelEvent::Stderr(_))));
        assert_eq!(events[1], ChannelEvent::ExitStatus(2));
    }

    #[tokio::test]
    async fn test_interactive_ends_on_signal() {
        let remote = MemoryRemote::new();
        let transport = remote.transport();
        let channel = transport.open_command("sleep 30", None).await.unwrap();
        channel
            .requests
            .send(ChannelRequest::Signal(Signal::Term))
            .await
            .unwrap();
        let events = drain(channel).await;
        assert!(events.contains(&ChannelEvent::ExitStatus(143)));
        assert_eq!(remote.signals(), vec![Signal::Term]);
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_channels() {
        let remote = MemoryRemote::new();
        let transport = remote.transport();
        remote.close_remote();
        transport.wait_closed().await;
        assert!(matches!(
            transport.open_command("echo hi", None).await,
            Err(SshRelayError::TransportClosure(_))
        ));
    }

    #[tokio::test]
    async fn test_transfer_rename_moves_subtree() {
        let remote = MemoryRemote::new();
        remote.mkdir("/tmp/a");
        remote.put_file("/tmp/a/f.txt", "x");
        let transfer = remote.transport().open_file_transfer().await.unwrap();

        transfer.rename("/tmp/a", "/tmp/b").await.unwrap();
        assert!(!remote.exists("/tmp/a"));
        assert_eq!(remote.file("/tmp/b/f.txt"), Some(b"x".to_vec()));

        assert!(transfer.remove_dir("/tmp/b").await.is_err());
        transfer.remove_file("/tmp/b/f.txt").await.unwrap();
        transfer.remove_dir("/tmp/b").await.unwrap();
        assert!(!remote.exists("/tmp/b"));
    }
}
