//! `nfcauth`: simulate an nfcauth card and reader, and manage the readers
//! registered on the card.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nfcauth_card::AuthMode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, filter::Builder};

mod commands;
mod config;

use commands::{ReaderCommands, public_key_command, readers_command, simulate_command};

#[derive(Parser)]
#[command(version, about = "Simulate an nfcauth card and reader, and manage registered readers")]
struct Cli {
    /// Configuration file (defaults to ./nfcauth.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug level output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register with and authenticate to an emulated card
    Simulate {
        /// Display name the simulated user confirms the registration with
        #[arg(long, default_value = "nfcauth user")]
        user_name: String,

        /// Authentication mode (defaults to the configured one)
        #[arg(long, value_parser = parse_auth_mode)]
        auth: Option<AuthMode>,

        /// Have the simulated user fail the biometric prompt
        #[arg(long)]
        deny_biometric: bool,
    },

    /// Manage readers registered on the card
    Readers {
        #[command(subcommand)]
        command: ReaderCommands,
    },

    /// Print the card public key
    PublicKey,
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let settings = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            user_name,
            auth,
            deny_biometric,
        } => simulate_command(&settings, &user_name, auth, deny_biometric),
        Commands::Readers { command } => readers_command(&settings.card, command),
        Commands::PublicKey => public_key_command(&settings.card),
    }
}

fn parse_auth_mode(value: &str) -> Result<AuthMode, String> {
    AuthMode::from_wire(value).ok_or_else(|| format!("expected background or biometric, got {value}"))
}

fn setup_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose).from_env_lossy())
        .with_ansi(true)
        .init();
}

/// Default of DEBUG when verbose, INFO otherwise; `RUST_LOG` directives apply on top
fn log_filter(verbose: bool) -> Builder {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    EnvFilter::builder().with_default_directive(level.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults() {
        let verbose = log_filter(true).parse_lossy("");
        assert_eq!(verbose.max_level_hint(), Some(LevelFilter::DEBUG));

        let quiet = log_filter(false).parse_lossy("");
        assert_eq!(quiet.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_log_filter_honours_directives() {
        let filter = log_filter(false).parse_lossy("nfcauth_card=trace");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_cli_parses_verbose_anywhere() {
        let cli = Cli::try_parse_from(["nfcauth", "public-key", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::PublicKey));
    }
}
