//! HTTP API for ssh-relay.
//!
//! Every session operation is a plain request/response call; long-running
//! commands are followed by polling their output.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check (never requires a key)
//! - `GET /api/v1/` - API information
//!
//! ### Sessions
//! - `GET /api/v1/sessions` - List connected sessions
//! - `POST /api/v1/sessions` - Connect to a host
//! - `DELETE /api/v1/sessions/{id}` - Disconnect
//! - `POST /api/v1/sessions/{id}/execute` - Dispatch a command
//! - `GET /api/v1/sessions/{id}/output?plain=` - Poll command output
//! - `POST /api/v1/sessions/{id}/input` - Write a line to the running command
//! - `POST /api/v1/sessions/{id}/signal` - Deliver INT, TERM or KILL
//! - `POST /api/v1/sessions/{id}/interrupt` - Send Ctrl-C
//! - `GET /api/v1/sessions/{id}/stats` - CPU, memory and disk usage
//!
//! ### Files
//! - `GET|DELETE /api/v1/sessions/{id}/files?path=` - List or delete
//! - `GET|PUT /api/v1/sessions/{id}/files/content` - Read or write text
//! - `POST /api/v1/sessions/{id}/files/rename` - Rename
//! - `POST /api/v1/sessions/{id}/files/upload` - Upload base64
//! - `GET /api/v1/sessions/{id}/files/download?path=` - Download base64
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ssh_relay::api::{serve_with_state, AppState, ServerConfig};
//! use ssh_relay::manager::SessionManager;
//! use ssh_relay::transport::{SshConnector, SshSettings};
//!
//! #[tokio::main]
//! async fn main() -> ssh_relay::Result<()> {
//!     let connector = Arc::new(SshConnector::new(SshSettings::default()));
//!     let state = AppState::new(SessionManager::new(connector));
//!     serve_with_state(ServerConfig::new("127.0.0.1", 3000), state).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;

// Re-export commonly used types
pub use handlers::{status_for, ApiResult, AppState};
pub use router::{create_router_with_state, serve_with_state, ServerConfig, MAX_BODY_BYTES};
pub use types::{
    AckResponse, ErrorResponse, ExecuteCommandRequest, ListSessionsResponse, OutputQuery,
    UploadRequest,
};
