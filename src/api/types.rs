//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::error::SshRelayError;
use crate::session::SessionSummary;
use crate::transport::{FileEntry, Signal};

/// Request to dispatch a command.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteCommandRequest {
    /// The command line to run.
    pub command: String,
    /// Skip the risky-command confirmation.
    #[serde(default)]
    pub force: bool,
}

/// Query for output polling.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputQuery {
    /// Strip terminal control sequences from the returned text.
    #[serde(default)]
    pub plain: bool,
}

/// Input for a running command.
#[derive(Debug, Clone, Deserialize)]
pub struct InputRequest {
    pub input: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalRequest {
    pub signal: Signal,
}

/// Query naming one remote path.
#[derive(Debug, Clone, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileRequest {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameRequest {
    pub from: String,
    pub to: String,
}

/// Upload payload: base64 or a base64 data URI.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub path: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionSummary>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListFilesResponse {
    pub path: String,
    pub entries: Vec<FileEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileContentResponse {
    pub path: String,
    pub content: String,
}

/// Acknowledgement for fire-and-forget requests.
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "SESSION_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn from_error(err: &SshRelayError) -> Self {
        let response = Self::new(err.code(), err.to_string());
        if err.is_terminal_for_session() {
            response.with_details("session is gone; stop polling")
        } else {
            response
        }
    }
}
