use waste_registry::{
    api::Server,
    chain::{BlockClock, BlockProducer},
    config::Config,
    journal::{EventJournal, JournalWriter},
    registry::{RegistryEngine, RegistryService},
    state::RegistryStore,
};
use tokio::sync::mpsc;
use tracing::info;

/// The main entry point for the registry service.
///
/// Initializes logging, loads the configuration, starts the block producer
/// and the event journal in the background, and serves the JSON-RPC API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = Config::load(&path)?;
    info!("Registry starting with config: {:?}", config);

    // Logical clock shared by the block producer and the registry
    let clock = BlockClock::new(config.chain.genesis_height);
    let producer = BlockProducer::new(clock.clone(), config.chain.clone());
    tokio::spawn(async move {
        if let Err(e) = producer.start().await {
            tracing::error!("Block producer error: {:?}", e);
        }
    });

    // Event journal fed by the registry service
    let journal = EventJournal::connect(&config.database.url).await?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let writer = JournalWriter::new(journal, events_rx);
    tokio::spawn(async move {
        if let Err(e) = writer.start().await {
            tracing::error!("Event journal error: {:?}", e);
        }
    });
    info!("Event journal attached at {}", config.database.url);

    let registry = RegistryService::new(RegistryEngine::new(RegistryStore::new()), clock)
        .with_journal(events_tx);

    let server = Server::new(config, registry);
    server.start().await?;

    Ok(())
}
