//! ssh-relay binary entry point.

use ssh_relay::api::{serve_with_state, AppState};
use ssh_relay::cli::{parse_args, print_help, print_version};
use ssh_relay::config::Config;
use ssh_relay::logging;
use ssh_relay::security::generate_api_key;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> ssh_relay::Result<()> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}\n\nRun 'ssh-relay --help' for usage.");
            std::process::exit(2);
        }
    };

    if args.help {
        print_help();
        return Ok(());
    }
    if args.version {
        print_version();
        return Ok(());
    }

    let mut config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    logging::init_with_level(Some(config.log_filter()));
    info!("ssh-relay v{}", env!("CARGO_PKG_VERSION"));

    if config.security.auth.enabled && config.security.auth.api_keys.is_empty() {
        let key = generate_api_key();
        warn!("Authentication enabled without keys; generated one for this run");
        println!("API key: {key}");
        config.security.auth.api_keys.push(key);
    }

    let server_config = match config.to_server_config() {
        Ok(server_config) => server_config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    let state = AppState::new(config.session_manager());
    serve_with_state(server_config, state).await
}
