//! Output processing.
//!
//! The session buffer keeps raw bytes exactly as the remote sent them,
//! terminal control sequences included. This module renders a readable view
//! of those bytes on request.
//!
//! # Example
//!
//! ```
//! use ssh_relay::output::plain_text;
//!
//! let raw = b"\x1b[31mRed text\x1b[0m\r\n";
//! assert_eq!(plain_text(raw), "Red text\n");
//! ```

mod sanitizer;

pub use sanitizer::plain_text;
