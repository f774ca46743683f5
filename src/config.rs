//! Configuration management for ssh-relay.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::cli::Args;
use crate::manager::{ManagerOptions, SessionManager};
use crate::security::RiskClassifier;
use crate::transport::{PtyRequest, SshConnector, SshSettings};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub security: SecuritySection,
    /// Outbound SSH behaviour.
    pub ssh: SshSection,
    pub classifier: ClassifierSection,
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Disconnect every session on Ctrl-C.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub auth: AuthSection,
}

/// API-key authentication for the HTTP surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub enabled: bool,
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSection {
    pub connect_timeout_secs: u64,
    pub keepalive_interval_secs: u64,
    /// Bound on the OS probe and the stats command.
    pub probe_timeout_secs: u64,
    /// Deliver signals natively instead of as control bytes.
    pub native_signals: bool,
    pub pty: PtySection,
}

impl Default for SshSection {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            keepalive_interval_secs: 30,
            probe_timeout_secs: 5,
            native_signals: true,
            pty: PtySection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PtySection {
    pub enabled: bool,
    pub term: String,
    pub cols: u32,
    pub rows: u32,
}

impl Default for PtySection {
    fn default() -> Self {
        let pty = PtyRequest::default();
        Self {
            enabled: true,
            term: pty.term,
            cols: pty.cols,
            rows: pty.rows,
        }
    }
}

/// Risky-command classifier tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    /// Prefixes flagged in addition to the built-in list.
    pub extra_patterns: Vec<String>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("SSH_RELAY_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("SSH_RELAY_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(key) = var("SSH_RELAY_API_KEY").filter(|k| !k.is_empty()) {
            self.add_api_key(key);
        }

        if let Some(level) = var("SSH_RELAY_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref key) = args.api_key {
            self.add_api_key(key.clone());
        }

        if args.no_auth {
            self.security.auth.enabled = false;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    fn add_api_key(&mut self, key: String) {
        self.security.auth.enabled = true;
        if !self.security.auth.api_keys.contains(&key) {
            self.security.auth.api_keys.push(key);
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env();
        config.apply_args(args);
        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port);
        if self.security.auth.enabled {
            server_config = server_config.with_api_keys(self.security.auth.api_keys.iter().cloned());
        }
        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    pub fn ssh_settings(&self) -> SshSettings {
        SshSettings {
            connect_timeout: Duration::from_secs(self.ssh.connect_timeout_secs),
            keepalive_interval: Duration::from_secs(self.ssh.keepalive_interval_secs),
        }
    }

    pub fn manager_options(&self) -> ManagerOptions {
        let pty = &self.ssh.pty;
        ManagerOptions {
            pty: pty.enabled.then(|| PtyRequest {
                term: pty.term.clone(),
                cols: pty.cols,
                rows: pty.rows,
            }),
            native_signals: self.ssh.native_signals,
            probe_timeout: Duration::from_secs(self.ssh.probe_timeout_secs),
        }
    }

    pub fn classifier(&self) -> RiskClassifier {
        RiskClassifier::with_patterns(self.classifier.extra_patterns.iter().cloned())
    }

    /// A session manager that connects over SSH with these settings.
    pub fn session_manager(&self) -> SessionManager {
        SessionManager::new(Arc::new(SshConnector::new(self.ssh_settings())))
            .with_classifier(self.classifier())
            .with_options(self.manager_options())
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
        }
    }
}

impl std::error::Error for ConfigError {}
