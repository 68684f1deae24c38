//! ApexWatch core service
//!
//! Ingests market, news and wallet events from the producer services, queues
//! them, and runs each one through context enrichment and LLM analysis.

mod api;
mod config;
mod maintenance;
mod server;
mod shutdown;
mod state;

use apexwatch_core::context::{ContextStore, HttpEnricher, PgContextBackend};
use apexwatch_core::framework::DatabaseProcessor;
use apexwatch_core::processors::{EventProcessor, QueueConsumer};
use apexwatch_core::queue::{EventQueue, PgEventQueue};
use apexwatch_core::reasoning::ReasoningClient;
use apexwatch_core::store::PgResultStore;
use clap::Parser;
use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::{shutdown_signal, spawn_config_reload_handler};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// ApexWatch - event analysis pipeline for token monitoring
#[derive(Parser, Debug)]
#[command(name = "apexwatch-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./apexwatch.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:8000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Override the shared access key
    #[arg(long, env = "ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting apexwatch-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(
        &args.config,
        args.listen,
        args.access_key.clone(),
    ));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.server.listen;
    tracing::info!(
        providers = loaded_config.reasoning.providers.len(),
        "Configuration loaded from {:?}",
        args.config
    );

    // Get database URL from environment
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Wire up the pipeline
    let db = DatabaseProcessor::new(db_pool.clone());
    let queue = Arc::new(PgEventQueue::new(db.clone(), loaded_config.queue.clone()));
    let context = ContextStore::new(
        Arc::new(PgContextBackend::new(db.clone())),
        Arc::new(HttpEnricher::new(loaded_config.producers.clone()).map_err(|e| {
            tracing::error!("Failed to build producer HTTP client: {}", e);
            e
        })?),
        loaded_config.context.clone(),
    );
    let reasoning = ReasoningClient::from_config(&loaded_config.reasoning);
    let results = Arc::new(PgResultStore::new(db.clone()));
    let processor = EventProcessor::new(context, reasoning, results);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn the queue consumer
    let consumer = QueueConsumer::new(queue.clone(), loaded_config.queue.clone());
    let consumer_handle = tokio::spawn(consumer.run(processor, shutdown_rx.clone()));

    // Spawn the context purge task
    let purge_handle = loaded_config
        .purge_interval
        .map(|interval| maintenance::spawn_context_purge(db, interval, shutdown_rx));

    // Create application state
    let state = AppState::new(db_pool.clone(), loaded_config.shared(), queue.clone());

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify = spawn_config_reload_handler(state.clone(), config_loader);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr, shutdown_signal()).await;

    // Stop the background tasks; the consumer finishes its current event first
    let _ = shutdown_tx.send(true);
    reload_notify.notify_one();
    if let Err(e) = consumer_handle.await {
        tracing::error!("Queue consumer task failed: {}", e);
    }
    if let Some(handle) = purge_handle {
        if let Err(e) = handle.await {
            tracing::error!("Context purge task failed: {}", e);
        }
    }

    queue.close().await;

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
