//! bitácora: command-line tool for hash-chained site logs.
//!
//! Usage:
//!   bitacora append --chain obra-42 --author "Ing. Salas" --category progress --description "Colado losa N3"
//!   bitacora verify --chain obra-42
//!   bitacora verify --snapshot obra-42.json
//!   bitacora show --chain obra-42
//!   bitacora export --chain obra-42 --output obra-42.json
//!   bitacora chains
//!   bitacora demo

mod commands;
mod runtime;
mod scenario;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bitacora_config::{BitacoraConfig, DEFAULT_CONFIG_FILE};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Tamper-evident operational log for construction sites.
///
/// Every entry is SHA-256 chained to the previous one; `verify` replays the
/// chain and reports the first altered, missing, or reordered entry.
#[derive(Parser)]
#[command(
    name = "bitacora",
    about = "Hash-chained bitácora (site operational log)",
    long_about = "Appends entries to SHA-256 hash-chained site logs and verifies\n\
                  that no entry has been altered, removed, or reordered."
)]
struct Cli {
    /// Configuration file. Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append one entry to a chain.
    Append(commands::AppendArgs),
    /// Verify a stored chain or an exported snapshot.
    Verify(commands::VerifyArgs),
    /// Print the entries of a chain.
    Show(commands::ShowArgs),
    /// Export a chain as a sealed JSON snapshot.
    Export(commands::ExportArgs),
    /// List the chains in the store.
    Chains,
    /// Build a sample site log in memory, tamper with it, and verify it.
    Demo,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let config = match BitacoraConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize structured logging.  RUST_LOG overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(false)
        .compact()
        .init();

    let result = match cli.command {
        Command::Append(args) => runtime::Runtime::from_config(&config)
            .and_then(|rt| commands::append(&rt, args)),
        Command::Verify(args) => runtime::Runtime::from_config(&config)
            .and_then(|rt| commands::verify(&rt, args)),
        Command::Show(args) => runtime::Runtime::from_config(&config)
            .and_then(|rt| commands::show(&rt, args)),
        Command::Export(args) => runtime::Runtime::from_config(&config)
            .and_then(|rt| commands::export(&rt, args)),
        Command::Chains => runtime::Runtime::from_config(&config).and_then(|rt| commands::chains(&rt)),
        Command::Demo => scenario::run_scenario().map(|_| commands::Outcome::Success),
    };

    match result {
        Ok(commands::Outcome::Success) => {}
        Ok(commands::Outcome::Compromised) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
