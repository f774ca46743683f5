//! Command-line interface for ssh-relay.

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments. Unset options leave lower-priority sources alone.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// API key for authentication (overrides config file).
    pub api_key: Option<String>,
    /// Disable authentication.
    pub no_auth: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    pub version: bool,
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('k') | Long("api-key") => {
                result.api_key = Some(parser.value()?.parse()?);
            }
            Long("no-auth") => {
                result.no_auth = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"ssh-relay {version}
Remote SSH sessions behind a polling HTTP API

USAGE:
    ssh-relay [OPTIONS]

OPTIONS:
    -H, --host <ADDR>       Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>       Port to listen on [default: 3000]
    -c, --config <FILE>     Path to configuration file (JSON)
    -k, --api-key <KEY>     API key for authentication
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
        --no-auth           Disable authentication
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    SSH_RELAY_HOST          Host address (overrides config)
    SSH_RELAY_PORT          Port number (overrides config)
    SSH_RELAY_API_KEY       API key (overrides config)
    SSH_RELAY_LOG_LEVEL     Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # Start with defaults (localhost:3000, no auth)
    ssh-relay

    # Listen on all interfaces and require a key
    ssh-relay -H 0.0.0.0 -p 8080 -k my-secret-key

    # Start with config file
    ssh-relay -c /etc/ssh-relay/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("ssh-relay {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("ssh-relay")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args_are_unset() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.host.is_none());
        assert!(result.port.is_none());
        assert!(!result.no_auth);
    }

    #[test]
    fn test_host_port() {
        let result = parse_args_from(args(&["-H", "0.0.0.0", "-p", "8080"])).unwrap();
        assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
        assert_eq!(result.port, Some(8080));
    }

    #[test]
    fn test_long_options() {
        let result =
            parse_args_from(args(&["--host", "192.168.1.1", "--port", "9000"])).unwrap();
        assert_eq!(result.host.unwrap().to_string(), "192.168.1.1");
        assert_eq!(result.port, Some(9000));
    }

    #[test]
    fn test_api_key_and_config() {
        let result = parse_args_from(args(&["-k", "my-secret", "-c", "/etc/relay.json"])).unwrap();
        assert_eq!(result.api_key.as_deref(), Some("my-secret"));
        assert_eq!(result.config, Some(PathBuf::from("/etc/relay.json")));
    }

    #[test]
    fn test_flags() {
        let result = parse_args_from(args(&["--no-auth", "-l", "debug"])).unwrap();
        assert!(result.no_auth);
        assert_eq!(result.log_level.as_deref(), Some("debug"));

        assert!(parse_args_from(args(&["--help"])).unwrap().help);
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse_args_from(args(&["-p", "invalid"])),
            Err(ArgsError::InvalidValue("port", _))
        ));
        assert!(matches!(
            parse_args_from(args(&["-H", "not-an-ip"])),
            Err(ArgsError::InvalidValue("host", _))
        ));
    }

    #[test]
    fn test_unknown_arguments() {
        assert!(matches!(
            parse_args_from(args(&["stray"])),
            Err(ArgsError::UnexpectedArgument(_))
        ));
        assert!(matches!(
            parse_args_from(args(&["--no-rate-limit"])),
            Err(ArgsError::Lexopt(_))
        ));
    }
}
