//! # ssh-relay
//!
//! Remote SSH sessions behind a polling request/response API.
//!
//! A caller connects to a host once and gets a session id back. Commands
//! are dispatched into the session and return immediately; their output
//! accumulates in a per-session buffer that the caller polls until the
//! command finishes. Files are moved over a separate transfer channel on
//! the same connection.
//!
//! ## Features
//!
//! - **Connection registry**: concurrent sessions keyed by opaque ids
//! - **Shell bridge**: one interactive command at a time, with input,
//!   signals and an idempotent output snapshot
//! - **Risk gating**: destructive commands need explicit confirmation
//! - **File transfer**: list, read, write, rename, recursive delete,
//!   base64 upload and download
//! - **Pluggable transport**: `russh` in production, an in-memory remote
//!   for tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ssh_relay::transport::{Credentials, SshConnector, SshSettings};
//! use ssh_relay::SessionManager;
//!
//! #[tokio::main]
//! async fn main() -> ssh_relay::Result<()> {
//!     ssh_relay::logging::try_init().ok();
//!
//!     let manager = SessionManager::new(Arc::new(SshConnector::new(SshSettings::default())));
//!     let creds = Credentials::password("10.0.0.5", 22, "deploy", "secret");
//!     let session = manager.connect(&creds).await?;
//!
//!     manager.execute_command(&session.session_id, "uptime", false).await?;
//!     let output = manager.read_output(&session.session_id, true)?;
//!     println!("{} (running: {})", output.output, output.is_running);
//!
//!     manager.disconnect(&session.session_id).await
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod output;
pub mod security;
pub mod session;
pub mod stats;
pub mod transfer;
pub mod transport;

// Re-export commonly used types
pub use error::{Result, SshRelayError};
pub use manager::{ConnectOutcome, ExecuteOutcome, ManagerOptions, SessionManager};
pub use output::plain_text;
pub use security::RiskClassifier;
pub use session::{
    ConnectionRegistry, OutputSnapshot, Session, SessionId, SessionSummary, ShellState,
};
pub use stats::SystemStats;
pub use transfer::Download;
pub use transport::{Connector, Credentials, Signal, Transport};
