//! Error types for ssh-relay.

use thiserror::Error;

/// Main error type for ssh-relay operations.
#[derive(Error, Debug)]
pub enum SshRelayError {
    /// Credentials were rejected or the host could not be authenticated.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The secure transport could not be established.
    #[error("transport error: {0}")]
    Transport(String),

    /// Session with the given ID was not found (never created or torn down).
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A command is already in flight on this session.
    #[error("a command is already running in session {0}")]
    AlreadyRunning(String),

    /// The command's channel is still opening; retry shortly.
    #[error("the command is still starting")]
    DispatchPending,

    /// Input or a signal was sent while nothing is running.
    #[error("no active command is running")]
    NoActiveCommand,

    /// A file-transfer operation failed. The session stays usable.
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// The connection dropped underneath the session.
    #[error("connection closed: {0}")]
    TransportClosure(String),

    /// Opening or driving a channel failed.
    #[error("channel error: {0}")]
    Channel(String),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::session::ShellState,
        to: crate::session::ShellState,
    },

    /// Caller supplied something unusable (empty command, bad payload).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

impl SshRelayError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(_) => "AUTH_FAILED",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::AlreadyRunning(_) => "ALREADY_RUNNING",
            Self::DispatchPending => "DISPATCH_PENDING",
            Self::NoActiveCommand => "NO_ACTIVE_COMMAND",
            Self::Transfer(_) => "TRANSFER_FAILED",
            Self::TransportClosure(_) => "TRANSPORT_CLOSED",
            Self::Channel(_) => "CHANNEL_ERROR",
            Self::InvalidStateTransition { .. } => "INVALID_STATE",
            Self::InvalidInput(_) => "BAD_REQUEST",
            Self::Io(_) | Self::LockPoisoned => "INTERNAL_ERROR",
        }
    }

    /// Whether the session this error came from can no longer be used.
    pub fn is_terminal_for_session(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::TransportClosure(_))
    }
}

/// Convenience Result type for ssh-relay operations.
pub type Result<T> = std::result::Result<T, SshRelayError>;
