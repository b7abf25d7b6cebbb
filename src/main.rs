//! Expense Reconciler CLI
//!
//! Reads a bank export and an expense-report export, reconciles them, and
//! writes matched and unmatched reports.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --bank bank.csv --certify certify.csv --output-dir out
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `info` to see zero-sum removals and the run summary,
//!   `debug` for per-person matching decisions

use clap::Parser;
use expense_recon::{ingest, report, MatchConfig, Reconciler, Result};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "expense-recon", version, about = "Reconcile bank postings against expense reports")]
struct Cli {
    /// Bank export (CSV)
    #[arg(long)]
    bank: PathBuf,

    /// Expense-report export (CSV)
    #[arg(long)]
    certify: PathBuf,

    /// Directory for the report files
    #[arg(long, default_value = "reconciliation_output")]
    output_dir: PathBuf,

    /// TOML file overriding tolerances and search bounds
    #[arg(long)]
    config: Option<PathBuf>,

    /// Look for zero-sum groups across all of a person's dates
    #[arg(long)]
    no_date_partition: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => MatchConfig::load(path)?,
        None => MatchConfig::default(),
    };
    if cli.no_date_partition {
        config.zero_sum.partition_by_date = false;
    }
    let reconciler = Reconciler::new(config)?;

    let bank = ingest::load_bank(&cli.bank)?;
    let certify = ingest::load_certify(&cli.certify)?;

    let result = reconciler.reconcile(&bank.transactions, &certify.transactions)?;
    let summary = report::save_results(&result, &bank, &certify, &cli.output_dir)?;

    println!("Reconciliation Summary:");
    println!("Matched Transactions: {}", summary.matched_rows);
    println!("Unmatched Bank Transactions: {}", summary.unmatched_bank);
    println!("Unmatched Certify Transactions: {}", summary.unmatched_certify);
    println!("Files saved in: {}", cli.output_dir.display());

    Ok(())
}
