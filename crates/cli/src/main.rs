//! Medstock CLI - record and report pharmacy stock movements.
//!
//! # Usage
//!
//! ```bash
//! # Receive 100 units of medication 1 into A0001
//! medstock receive -m 1 -l A0001 -e 01/01/2030 -q 100
//!
//! # Withdraw 30 units
//! medstock withdraw -m 1 -l A0001 -q 30
//!
//! # Balances, expired batches, FEFO plan
//! medstock stock --view location
//! medstock expired --dispose
//! medstock plan -d 1=50 -d 2=10 --execute
//! ```
//!
//! Paths and log format come from `medstock.toml` or `MEDSTOCK_*` variables
//! (see [`config`]).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use medstock_core::{MedicationId, MovementId, StockDate, SystemClock};
use medstock_infra::{CatalogStore, CsvCatalogStore, CsvLedgerStore, StockService};

mod commands;
mod config;
mod output;

use crate::config::MedstockConfig;
use crate::output::Output;

#[derive(Parser)]
#[command(name = "medstock")]
#[command(author, version, about = "Pharmacy stock ledger")]
struct Cli {
    /// Configuration file (default: ./medstock.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a receipt (stock in)
    Receive {
        /// Movement date, dd/mm/yyyy (default: today)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        medication: MedicationId,

        /// Location code, e.g. A0001 (G = refrigerated)
        #[arg(short, long)]
        location: String,

        /// Batch expiry, dd/mm/yyyy
        #[arg(short, long)]
        expiry: String,

        #[arg(short, long)]
        quantity: u32,
    },
    /// Record a withdrawal (stock out)
    Withdraw {
        /// Movement date, dd/mm/yyyy (default: today)
        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        medication: MedicationId,

        #[arg(short, long)]
        location: String,

        /// Expiry of the batch being depleted, if any
        #[arg(short, long)]
        expiry: Option<String>,

        #[arg(short, long)]
        quantity: u32,
    },
    /// Show balances
    Stock {
        #[arg(long, value_enum, default_value_t = StockView::Current)]
        view: StockView,

        /// Count only movements dated on or before this day (default: today)
        #[arg(long)]
        as_of: Option<StockDate>,
    },
    /// List expired batches that still hold stock
    Expired {
        #[arg(long)]
        as_of: Option<StockDate>,

        /// Record a withdrawal for every listed batch
        #[arg(long)]
        dispose: bool,
    },
    /// Plan withdrawals first-expire-first-out
    Plan {
        /// MEDICATION=QUANTITY, repeatable
        #[arg(short, long = "demand", value_parser = commands::stock::parse_demand, required = true)]
        demand: Vec<(MedicationId, u32)>,

        /// Record the planned withdrawals
        #[arg(long)]
        execute: bool,
    },
    /// List movements between two dates (inclusive)
    History {
        #[arg(long)]
        from: Option<StockDate>,

        #[arg(long)]
        to: Option<StockDate>,
    },
    /// Physically remove a movement (administrative correction)
    Purge {
        #[arg(long)]
        id: MovementId,
    },
    /// List registered medications
    Medications {
        /// Case-insensitive name fragment
        #[arg(short, long)]
        search: Option<String>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum StockView {
    /// Positive balances per location and medication, with latest expiry
    Current,
    /// Total per medication
    Medication,
    /// Per location, per medication
    Location,
    /// Per batch
    Detail,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("command failed: {e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = MedstockConfig::load(cli.config.as_deref()).context("loading configuration")?;
    medstock_observability::init(config.log_format);

    let catalog = CsvCatalogStore::new(&config.catalog_path)
        .load()
        .with_context(|| format!("reading catalog {}", config.catalog_path.display()))?;
    for error in &catalog.errors {
        tracing::warn!(path = %config.catalog_path.display(), "{error}");
    }

    let service = StockService::new(CsvLedgerStore::new(&config.ledger_path), catalog.catalog, SystemClock);
    let report = service
        .load()
        .with_context(|| format!("reading ledger {}", config.ledger_path.display()))?;
    for error in &report.errors {
        tracing::warn!(path = %config.ledger_path.display(), "{error}");
    }

    let expired = service.expired_count(None).context("counting expired batches")?;
    if let Some(warning) = expiry_warning(expired) {
        tracing::warn!(expired, "expired batches still in stock");
        eprintln!("{warning}");
    }

    let out = Output::new(cli.json);
    match cli.command {
        Commands::Receive {
            date,
            medication,
            location,
            expiry,
            quantity,
        } => commands::movements::receive(&service, &out, date, medication, location, expiry, quantity),
        Commands::Withdraw {
            date,
            medication,
            location,
            expiry,
            quantity,
        } => commands::movements::withdraw(&service, &out, date, medication, location, expiry, quantity),
        Commands::Stock { view, as_of } => commands::stock::stock(&service, &out, view, as_of),
        Commands::Expired { as_of, dispose } => commands::stock::expired(&service, &out, as_of, dispose),
        Commands::Plan { demand, execute } => commands::stock::plan(&service, &out, demand, execute),
        Commands::History { from, to } => commands::movements::history(&service, &out, from, to),
        Commands::Purge { id } => commands::movements::purge(&service, &out, id),
        Commands::Medications { search } => commands::medications::list(&service, &out, search.as_deref()),
    }
}

/// Startup notice for expired batches still holding stock. Goes to stderr so
/// `--json` output stays parseable.
fn expiry_warning(count: usize) -> Option<String> {
    match count {
        0 => None,
        1 => Some("warning: 1 expired batch still in stock (see `medstock expired`)".to_string()),
        n => Some(format!("warning: {n} expired batches still in stock (see `medstock expired`)")),
    }
}
