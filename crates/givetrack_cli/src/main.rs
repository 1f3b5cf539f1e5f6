//! Givetrack CLI
//!
//! Command-line tools for Givetrack device and cloud stores.
//!
//! # Commands
//!
//! - `init` - Create a profile in both stores
//! - `inspect` - Display stamps and row counts
//! - `reconcile` - Reconcile the device store with the cloud store
//! - `add` / `remove` - Add or remove a beneficiary
//! - `commit` - Commit one transaction batch
//! - `calibrate` - Run a calibrator operation on a list of shares

mod commands;

use clap::{Parser, Subcommand};
use commands::calibrate::Operation;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Givetrack command-line store tools.
#[derive(Parser)]
#[command(name = "givetrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the device store directory
    #[arg(global = true, short, long)]
    local: Option<PathBuf>,

    /// Path to the cloud store directory
    #[arg(global = true, short, long)]
    remote: Option<PathBuf>,

    /// Owner identifier
    #[arg(global = true, short, long)]
    owner: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a profile in both stores
    Init {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Giving pool split on each commit
        #[arg(short, long, default_value = "0")]
        pool: f64,
    },

    /// Display table stamps and row counts
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Reconcile the device store with the cloud store
    Reconcile {
        /// Collection to reconcile (all synchronized collections if omitted)
        #[arg(short, long)]
        collection: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Add a beneficiary
    Add {
        /// Beneficiary identifier
        id: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },

    /// Remove a beneficiary and recalibrate the rest
    Remove {
        /// Beneficiary identifier
        id: String,
    },

    /// Commit one transaction batch
    Commit {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a calibrator operation on a list of shares
    Calibrate {
        /// Operation to run
        #[arg(value_enum)]
        operation: Operation,

        /// Comma-separated shares
        #[arg(short, long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        percents: Vec<f64>,

        /// Element index for shift and remove
        #[arg(short, long, default_value = "0")]
        index: usize,

        /// Shift magnitude
        #[arg(short, long, default_value = "0.01", allow_negative_numbers = true)]
        magnitude: f64,

        /// Decimal places of tolerance
        #[arg(long, default_value = "4")]
        precision: u32,

        /// Apply reset or recalibrate even when the shares are proportionate
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { email, pool } => {
            let stores = commands::Stores::open(&cli.local, &cli.remote, &cli.owner)?;
            commands::account::init(&stores, &email, pool)?;
        }
        Commands::Inspect { format } => {
            let local = cli.local.ok_or("Device store path required for inspect")?;
            let owner = cli.owner.ok_or("Owner required for inspect")?;
            commands::inspect::run(&local, cli.remote.as_deref(), &owner, &format)?;
        }
        Commands::Reconcile { collection, format } => {
            let stores = commands::Stores::open(&cli.local, &cli.remote, &cli.owner)?;
            commands::reconcile::run(&stores, collection.as_deref(), &format)?;
        }
        Commands::Add { id, name } => {
            let stores = commands::Stores::open(&cli.local, &cli.remote, &cli.owner)?;
            commands::account::add(&stores, &id, &name)?;
        }
        Commands::Remove { id } => {
            let stores = commands::Stores::open(&cli.local, &cli.remote, &cli.owner)?;
            commands::account::remove(&stores, &id)?;
        }
        Commands::Commit { format } => {
            let stores = commands::Stores::open(&cli.local, &cli.remote, &cli.owner)?;
            commands::account::commit(&stores, &format)?;
        }
        Commands::Calibrate {
            operation,
            percents,
            index,
            magnitude,
            precision,
            force,
        } => {
            commands::calibrate::run(operation, percents, index, magnitude, precision, force)?;
        }
        Commands::Version => {
            println!("Givetrack CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
