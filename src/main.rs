//! tokenward: issue, verify, refresh, and revoke JSON Web Tokens from the
//! command line.
//!
//! Loads configuration, installs logging, and dispatches to a subcommand.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use tokenward_core::config::AppConfig;
use tokenward_core::error::AuthError;

mod commands;
mod output;

use commands::Cli;

fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = cli.execute(&config) {
        tracing::debug!(kind = %e.kind, "Command failed");
        output::print_error(&e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration(path: Option<&str>) -> Result<AppConfig, AuthError> {
    let config_path = match path {
        Some(path) => path.to_string(),
        None => std::env::var("TOKENWARD_CONFIG").unwrap_or_else(|_| "config/default".to_string()),
    };

    AppConfig::load(&config_path)
}

/// Initialize tracing/logging. Logs go to stderr so stdout stays valid JSON.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
