//! Session identifier type.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Opaque handle for one remote session.
///
/// IDs are random v4 UUIDs generated at connect time and rendered in the
/// usual hyphenated form. They are unique per successful connect and never
/// reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = crate::error::SshRelayError;

    /// An unparsable ID can never name a live session, so it reports
    /// `SessionNotFound` rather than a parse error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|_| crate::error::SshRelayError::SessionNotFound(s.into()))
    }
}
