/*!
 * bluectl
 * Paired Bluetooth device control via BlueZ D-Bus
 */

use std::io;
use std::process::ExitCode;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};
use tracing::debug;

mod bluetooth;
mod commands;
mod config;
mod error;

use bluetooth::BluezClient;
use config::Config;
use error::CliError;

#[derive(Parser, Debug)]
#[command(name = "bluectl")]
#[command(about = "List, connect and disconnect paired Bluetooth devices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "/etc/bluectl/config.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all paired devices
    List,
    /// Connect to a device
    Connect {
        /// Device MAC address, e.g. 38:18:4C:A2:55:01
        #[arg(value_name = "MAC")]
        address: String,
    },
    /// Disconnect from a device
    Disconnect {
        /// Device MAC address, e.g. 38:18:4C:A2:55:01
        #[arg(value_name = "MAC")]
        address: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return report_parse_error(&err),
    };

    // Logs stay on stderr and quiet by default, stdout carries command
    // output only
    let log_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("bluectl={}", log_level))
        .with_writer(io::stderr)
        .init();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            println!("Invalid configuration {}: {}", cli.config, e);
            return ExitCode::from(1);
        }
    };

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Keeps the tool's `Unknown command: <name>` contract while letting clap
/// handle usage errors and --help/--version.
fn report_parse_error(err: &clap::Error) -> ExitCode {
    if let Some((message, code)) = unknown_command_report(err) {
        println!("{}", message);
        return ExitCode::from(code);
    }

    let _ = err.print();
    if err.use_stderr() {
        // Missing or malformed arguments share the caller-error code
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Message and exit code for an unrecognized subcommand, `None` for every
/// other parse failure. The name comes from the clap error itself so flags
/// ahead of the subcommand cannot be misreported.
fn unknown_command_report(err: &clap::Error) -> Option<(String, u8)> {
    if err.kind() != ErrorKind::InvalidSubcommand {
        return None;
    }
    let name = match err.get(ContextKind::InvalidSubcommand) {
        Some(ContextValue::String(name)) => name.as_str(),
        _ => "",
    };
    Some((format!("Unknown command: {}", name), 1))
}

async fn run(command: Commands, config: &Config) -> Result<(), CliError> {
    let bluez = BluezClient::new(config).await?;
    let mut stdout = io::stdout().lock();

    match command {
        Commands::List => commands::list(&bluez, &mut stdout).await,
        Commands::Connect { address } => {
            debug!("connect requested for {}", address);
            commands::connect(&bluez, &mut stdout, &address).await
        }
        Commands::Disconnect { address } => {
            debug!("disconnect requested for {}", address);
            commands::disconnect(&bluez, &mut stdout, &address).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_subcommand_reports_name_and_caller_error_code() {
        let err = Cli::try_parse_from(["bluectl", "foo"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);

        let (message, code) = unknown_command_report(&err).unwrap();
        assert_eq!(message, "Unknown command: foo");
        assert_eq!(code, 1);
    }

    #[test]
    fn unknown_subcommand_after_flags_reports_the_subcommand() {
        let err = Cli::try_parse_from(["bluectl", "--debug", "pair"]).unwrap_err();

        let (message, code) = unknown_command_report(&err).unwrap();
        assert_eq!(message, "Unknown command: pair");
        assert_eq!(code, 1);
    }

    #[test]
    fn usage_errors_keep_clap_rendering() {
        // Missing required MAC positional is a usage error, not an
        // unknown command
        let err = Cli::try_parse_from(["bluectl", "connect"]).unwrap_err();
        assert_ne!(err.kind(), ErrorKind::InvalidSubcommand);
        assert_eq!(unknown_command_report(&err), None);
    }
}
