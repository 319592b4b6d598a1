// Command line front end for a local asset ledger

use anyhow::Context;
use asset_ledger::{LedgerConfig, LedgerService, TimeStamp, events::TracingSink, utils};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "asset-ledger")]
#[command(about = "Accounts, inventory, escrowed trades and redemptions on a local ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ledger database directory
    #[arg(long, global = true, default_value = "asset-ledger.db")]
    db: PathBuf,

    /// Transaction timestamp (RFC 3339), defaults to now
    #[arg(long, global = true)]
    tx_time: Option<String>,

    /// Seed the default commodity catalog on open
    #[arg(long, global = true)]
    seed: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a call and commit its writes
    Invoke {
        /// Entry point, optionally qualified (e.g. TradeContract:CreateTrade)
        function: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Evaluate a call without committing anything
    Query {
        function: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Mint a fresh bech32 identifier
    NewId {
        /// Human readable prefix
        #[arg(default_value = utils::TRADE_HRP)]
        hrp: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::NewId { hrp } = &cli.command {
        println!("{}", utils::new_uuid_to_bech32(hrp)?);
        return Ok(());
    }

    let timestamp = match &cli.tx_time {
        Some(raw) => TimeStamp::parse_rfc3339(raw)?,
        None => TimeStamp::from(Utc::now()),
    };

    let config = LedgerConfig::new(&cli.db).set_seed_catalog(cli.seed);
    let service = LedgerService::open(&config)
        .with_context(|| format!("failed to open ledger at {}", cli.db.display()))?
        .with_sink(TracingSink);

    match cli.command {
        Commands::Invoke { function, args } => {
            let (value, receipt) = service.invoke(timestamp, &function, &args)?;
            let output = serde_json::json!({ "result": value, "receipt": receipt });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Query { function, args } => {
            let value = service.query(timestamp, &function, &args)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Commands::NewId { .. } => {}
    }

    Ok(())
}
