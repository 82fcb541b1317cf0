use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tollway::application::engine::TollEngine;
use tollway::config::{DepositPolicy, EngineConfig, RoutePriceEvents};
use tollway::domain::money::Amount;
use tollway::domain::ports::{PayoutGatewayBox, SnapshotStoreBox};
use tollway::infrastructure::in_memory::{InMemoryPayoutGateway, InMemorySnapshotStore};
use tollway::interfaces::csv::balance_writer::BalanceWriter;
use tollway::interfaces::csv::command_reader::CommandReader;
use tollway::interfaces::csv::event_writer::write_events;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON engine configuration. Overrides the engine flags below.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Identity bound into every secret commitment
    #[arg(long, default_value = "tollway")]
    engine_id: String,

    /// Party that collects fees
    #[arg(long, default_value = "operator")]
    beneficiary: String,

    /// Minimum deposit before the vehicle multiplier is applied
    #[arg(long, default_value_t = 100)]
    base_deposit: u64,

    #[arg(long, value_enum, default_value_t = DepositPolicy::Multiplied)]
    deposit_policy: DepositPolicy,

    #[arg(long, value_enum, default_value_t = RoutePriceEvents::Always)]
    route_price_events: RoutePriceEvents,

    /// Write the event journal here as JSON lines
    #[arg(long)]
    events_out: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn engine_config(&self) -> tollway::error::Result<EngineConfig> {
        match &self.config {
            Some(path) => EngineConfig::from_json_file(path),
            None => Ok(EngineConfig::new(
                self.engine_id.clone(),
                self.beneficiary.clone(),
                Amount::new(self.base_deposit),
            )
            .with_deposit_policy(self.deposit_policy)
            .with_route_price_events(self.route_price_events)),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn snapshot_store(db_path: Option<&PathBuf>) -> Result<SnapshotStoreBox> {
    use tollway::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(InMemorySnapshotStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn snapshot_store(db_path: Option<&PathBuf>) -> Result<SnapshotStoreBox> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(Box::new(InMemorySnapshotStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = cli.engine_config().into_diagnostic()?;
    let store = snapshot_store(cli.db_path.as_ref())?;
    let payouts: PayoutGatewayBox = Box::new(InMemoryPayoutGateway::new());

    let engine = match store.load().await.into_diagnostic()? {
        Some(snapshot) => TollEngine::restore(&config, payouts, snapshot).into_diagnostic()?,
        None => TollEngine::new(&config, payouts).into_diagnostic()?,
    };

    // Process commands
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for (row, command) in reader.commands().enumerate() {
        match command {
            Ok(command) => {
                if let Err(e) = engine.execute(command).await {
                    tracing::warn!(row = row + 1, error = %e, "command rejected");
                }
            }
            Err(e) => {
                tracing::warn!(row = row + 1, error = %e, "command unreadable");
            }
        }
    }

    store.save(&engine.snapshot().await).await.into_diagnostic()?;

    if let Some(path) = &cli.events_out {
        let file = File::create(path).into_diagnostic()?;
        write_events(io::BufWriter::new(file), &engine.events().await).into_diagnostic()?;
    }

    // Output final balances
    let balances = engine.balances().await;
    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(&balances).into_diagnostic()?;

    Ok(())
}
