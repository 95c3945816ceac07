//! SignFlow: tamper-evident contract audit ledger CLI.
//!
//! Runs the reference scenarios and inspects JSON-lines ledgers on disk.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- lifecycle [--config signflow.toml]
//!   cargo run -p demo -- tamper
//!   cargo run -p demo -- retention
//!   cargo run -p demo -- verify --config signflow.toml --contract 1
//!   cargo run -p demo -- export --config signflow.toml --contract 1 --format csv
//!   cargo run -p demo -- hash var/documents/contract-1-signed.pdf

mod ledger_directory;

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use signflow_audit::{open_store, AuditLedger};
use signflow_config::LedgerConfig;
use signflow_contracts::{
    entry::ContractId,
    error::{SignflowError, SignflowResult},
    export::ExportFormat,
};
use signflow_ref_contracts::{
    scenarios::{retention, signing_flow, tamper_drill},
    ContractLifecycle,
};
use signflow_verify::{hash_file, IntegrityVerifier};

use crate::ledger_directory::LedgerDirectory;

// ── CLI definition ────────────────────────────────────────────────────────────

/// SignFlow: hash-chained audit trail for contract signing.
#[derive(Parser)]
#[command(
    name = "signflow",
    about = "SignFlow contract audit ledger",
    long_about = "Runs the SignFlow reference scenarios and verifies or exports\n\
                  JSON-lines audit ledgers."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Scenario 1: generate, view, sign and upload a contract, then verify it.
    Lifecycle {
        /// Record into the ledger and document root named by this config
        /// instead of a throwaway in-memory ledger.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Scenario 2: tamper with a stored entry and a signed document.
    Tamper,
    /// Scenario 3: manual deletion, signed-contract protection, expiry cleanup.
    Retention,
    /// Verify a contract's chain and signed document.
    Verify {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        contract: u64,
    },
    /// Print a contract's audit trail, newest first.
    Export {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        contract: u64,
        /// `json` or `csv`.
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Print the SHA-256 of a file.
    Hash { file: PathBuf },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug to see every append.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::RunAll => {
            print_banner();
            run_all().map(|_| true)
        }
        Command::Lifecycle { config } => {
            print_banner();
            run_lifecycle(config).map(|_| true)
        }
        Command::Tamper => {
            print_banner();
            tamper_drill::run_scenario().map(|_| true)
        }
        Command::Retention => {
            print_banner();
            retention::run_scenario().map(|_| true)
        }
        Command::Verify { config, contract } => run_verify(config, ContractId(contract)),
        Command::Export {
            config,
            contract,
            format,
        } => run_export(config, ContractId(contract), &format).map(|_| true),
        Command::Hash { file } => hash_file(&file).map(|hash| {
            println!("{}  {}", hash, file.display());
            true
        }),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("signflow error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_all() -> SignflowResult<()> {
    signing_flow::run_scenario()?;
    tamper_drill::run_scenario()?;
    retention::run_scenario()?;
    println!("All scenarios completed successfully.");
    Ok(())
}

fn run_lifecycle(config: Option<PathBuf>) -> SignflowResult<()> {
    match config {
        None => signing_flow::run_scenario(),
        Some(path) => {
            let config = LedgerConfig::from_file(&path)?;
            let lifecycle = ContractLifecycle::from_config(&config)?;
            let id = signing_flow::run_with(&lifecycle)?;
            info!(contract_id = %id, config = %path.display(), "lifecycle recorded to configured ledger");
            println!("Recorded contract #{} in {}", id, path.display());
            Ok(())
        }
    }
}

// ── Ledger tools ──────────────────────────────────────────────────────────────

/// Prints the integrity report as JSON. `Ok(false)` when either check fails.
fn run_verify(config: PathBuf, contract_id: ContractId) -> SignflowResult<bool> {
    let config = LedgerConfig::from_file(&config)?;
    let store = open_store(&config.storage)?;
    let directory = Arc::new(LedgerDirectory::new(store.clone(), config.documents.root.clone()));

    let report = IntegrityVerifier::new(store, directory).verify_contract(contract_id)?;
    let rendered = serde_json::to_string_pretty(&report).map_err(|e| SignflowError::StorageError {
        reason: format!("failed to render report: {}", e),
    })?;
    println!("{}", rendered);

    Ok(report.is_fully_valid())
}

fn run_export(config: PathBuf, contract_id: ContractId, format: &str) -> SignflowResult<()> {
    let format: ExportFormat = format.parse()?;
    let config = LedgerConfig::from_file(&config)?;
    let ledger = AuditLedger::from_config(&config)?;
    print!("{}", ledger.export(contract_id, format)?);
    if format == ExportFormat::Json {
        println!();
    }
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("SignFlow: Contract Audit Ledger");
    println!("Reference Demo");
    println!("===============================");
    println!();
    println!("Every lifecycle action is appended to a per-contract hash chain:");
    println!("  [1] Read the contract's latest entry");
    println!("  [2] Digest its canonical fields (SHA-256) as the new entry's previous_hash");
    println!("  [3] Insert, conditional on the head not having moved");
    println!("  [4] Verification replays the chain and re-hashes signed documents");
    println!();
}
