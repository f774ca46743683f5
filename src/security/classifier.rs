//! Destructive-command classification.

use crate::error::SshRelayError;
use crate::Result;

/// Prefixes that mark a command as destructive.
///
/// Matched against the command with leading whitespace removed,
/// case-sensitively.
const BASELINE_PATTERNS: &[&str] = &[
    "rm -rf",
    "rm -fr",
    "chmod 777",
    "chmod -R 777",
    "mkfs",
    ":(){",
];

/// Classifies commands as risky before they reach a remote shell.
#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    extra: Vec<String>,
}

impl RiskClassifier {
    /// Classifier with the baseline pattern set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with additional prefix patterns. Blank entries are ignored.
    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.trim().is_empty())
                .collect(),
        }
    }

    /// Whether `command` needs explicit confirmation.
    pub fn is_risky(&self, command: &str) -> bool {
        let command = command.trim_start();

        // raw block-device writes: `dd` followed by whitespace
        if let Some(rest) = command.strip_prefix("dd") {
            if rest.starts_with(char::is_whitespace) {
                return true;
            }
        }

        BASELINE_PATTERNS
            .iter()
            .copied()
            .chain(self.extra.iter().map(String::as_str))
            .any(|pattern| command.starts_with(pattern))
    }

    /// Reject commands that cannot be dispatched at all.
    pub fn validate(&self, command: &str) -> Result<()> {
        if command.trim().is_empty() {
            return Err(SshRelayError::InvalidInput("command is empty".into()));
        }
        if command.contains('\0') {
            return Err(SshRelayError::InvalidInput(
                "command contains a NUL byte".into(),
            ));
        }
        Ok(())
    }
}
