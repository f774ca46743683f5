//! Session management module.
//!
//! Session identifiers, the connection registry, and the per-session
//! interactive shell bridge with its explicit state machine.

mod id;
mod registry;
mod shell;
mod state;

pub use id::SessionId;
pub use registry::{ConnectionRegistry, Session, SessionInfo, SessionSummary};
pub use shell::{Dispatch, OutputSnapshot, ShellBridge};
pub use state::ShellState;
