use checkout_gateway::application::gateway::Gateway;
use checkout_gateway::domain::order::Order;
use checkout_gateway::domain::ports::{OrderStoreBox, SettingsProviderBox};
use checkout_gateway::infrastructure::in_memory::{InMemoryOrderStore, StaticSettings};
use checkout_gateway::infrastructure::settings_file::JsonFileSettings;
use checkout_gateway::infrastructure::simulated::SimulatedProcessor;
use checkout_gateway::interfaces::csv::event_reader::EventReader;
use checkout_gateway::interfaces::csv::outcome_writer::OutcomeWriter;
use checkout_gateway::interfaces::replay::replay_event;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "checkout_gateway=info";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Order events CSV file (action,order,amount,currency,token,message)
    input: PathBuf,

    /// JSON array of orders to seed the store with
    #[arg(long)]
    orders: Option<PathBuf>,

    /// JSON object with the gateway settings, re-read on every operation
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_orders(path: Option<PathBuf>) -> Result<Vec<Order>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let file = File::open(path).into_diagnostic()?;
    serde_json::from_reader(file).into_diagnostic()
}

#[cfg(feature = "storage-rocksdb")]
async fn open_store(db_path: Option<PathBuf>, orders: Vec<Order>) -> Result<OrderStoreBox> {
    use checkout_gateway::infrastructure::rocksdb::RocksDBOrderStore;

    if let Some(db_path) = db_path {
        let store = RocksDBOrderStore::open(db_path).into_diagnostic()?;
        for order in orders {
            store.insert(order).await.into_diagnostic()?;
        }
        return Ok(Box::new(store));
    }
    Ok(in_memory(orders).await)
}

#[cfg(not(feature = "storage-rocksdb"))]
async fn open_store(db_path: Option<PathBuf>, orders: Vec<Order>) -> Result<OrderStoreBox> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory(orders).await)
}

async fn in_memory(orders: Vec<Order>) -> OrderStoreBox {
    let store = InMemoryOrderStore::new();
    for order in orders {
        store.insert(order).await;
    }
    Box::new(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let orders = load_orders(cli.orders)?;
    info!(orders = orders.len(), "seeding order store");
    let store = open_store(cli.db_path, orders).await?;

    let settings: SettingsProviderBox = match cli.settings {
        Some(path) => Box::new(JsonFileSettings::new(path)),
        None => {
            warn!("No --settings file given; every operation will report a configuration error");
            Box::new(StaticSettings::new())
        }
    };

    let processor = SimulatedProcessor::new();
    let gateway = Gateway::new(processor.factory(), store, settings);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());

    for event_result in reader.events() {
        match event_result {
            Ok(event) => match replay_event(&gateway, &event).await {
                Ok(row) => writer.write(&row).into_diagnostic()?,
                Err(e) => error!(action = %event.action, error = %e, "Error processing event"),
            },
            Err(e) => error!(error = %e, "Error reading event"),
        }
    }
    writer.flush().into_diagnostic()?;

    info!(processor_calls = processor.calls(), "replay finished");
    Ok(())
}
