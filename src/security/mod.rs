//! Security module for ssh-relay.
//!
//! - **Risk classification**: prefix patterns for destructive commands that
//!   need explicit confirmation before dispatch
//! - **API key authentication**: bearer-token middleware for the HTTP layer
//!
//! ## Example
//!
//! ```rust
//! use ssh_relay::security::{ApiKeyStore, RiskClassifier};
//!
//! let classifier = RiskClassifier::new();
//! assert!(classifier.is_risky("rm -rf /tmp/build"));
//! assert!(!classifier.is_risky("ls -la"));
//!
//! let keys = ApiKeyStore::with_keys(["my-secret-key"]);
//! assert!(keys.is_valid("my-secret-key"));
//! ```

pub mod auth;
pub mod classifier;

pub use auth::{auth_middleware, generate_api_key, ApiKeyStore};
pub use classifier::RiskClassifier;
