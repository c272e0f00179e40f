//! # kms CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! The algorithm catalog is checked before any command runs.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kms_cli::algorithms::{run_algorithms, AlgorithmsArgs};
use kms_cli::inspect::{run_inspect, InspectArgs};
use kms_cli::keygen::{run_keygen, KeygenArgs};
use kms_cli::load_config;
use kms_cli::roundtrip::{run_roundtrip, RoundtripArgs};
use kms_cli::settings::run_config;

/// Elastic key pool KMS core.
///
/// Lists the algorithm catalog, generates importable JWKs, runs in-memory
/// pools through encrypt/decrypt and sign/verify round-trips, and decodes
/// JOSE protected headers.
#[derive(Parser, Debug)]
#[command(name = "kms", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit log lines as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to a YAML service configuration. Defaults to `KMS_*` variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the algorithm catalog.
    Algorithms(AlgorithmsArgs),

    /// Generate a private JWK for an algorithm.
    Keygen(KeygenArgs),

    /// Run a pool through key creation, round-trips, and rotation.
    Roundtrip(RoundtripArgs),

    /// Decode the protected header of a compact JWE or JWS.
    Inspect(InspectArgs),

    /// Print the effective service configuration.
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "kms CLI starting");

    match dispatch(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn dispatch(cli: Cli) -> anyhow::Result<u8> {
    kms_crypto::verify_catalog().context("algorithm catalog is inconsistent")?;

    match cli.command {
        Commands::Algorithms(args) => run_algorithms(&args),
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Roundtrip(args) => run_roundtrip(&args, load_config(cli.config.as_deref())?),
        Commands::Inspect(args) => run_inspect(&args),
        Commands::Config => run_config(&load_config(cli.config.as_deref())?),
    }
}
