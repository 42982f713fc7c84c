//! Chandlery Server
//!
//! Headless checkout counter for a ship-chandlery storefront: order
//! assembly over four payment rails plus background payment
//! reconciliation.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use chandlery_core::checkout::Checkout;
use chandlery_core::events::order_status_changed_channel;
use chandlery_core::providers::{CryptoPayClient, HostedCheckoutClient};
use chandlery_core::rails::Rails;
use chandlery_core::reconcile::{ReconcilePoller, Reconciler};
use chandlery_core::store::{OrderStore, PgOrderStore};

use config::{ConfigLoader, get_database_url};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use state::AppState;

/// Chandlery - headless storefront checkout and reconciliation server
#[derive(Parser, Debug)]
#[command(name = "chandlery-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./chandlery-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

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

    tracing::info!("Starting chandlery-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let listen_addr = loaded_config.listen;
    let card_config = loaded_config.card.clone();
    let crypto_config = loaded_config.crypto.clone();
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Convert to shared config with separate locks for each section
    let shared_config = loaded_config.into_shared();

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

    // Wire up the core services
    let store: Arc<dyn OrderStore> = Arc::new(PgOrderStore::new(db_pool.clone()));

    let card = Arc::new(HostedCheckoutClient::new(
        card_config.api_base,
        card_config.api_key,
    ));
    let crypto = Arc::new(CryptoPayClient::new(
        crypto_config.api_base,
        crypto_config.api_key,
    ));

    // The payee lock is shared with SharedConfig so a SIGHUP reload
    // reaches the bank-transfer rail without rebuilding it.
    let rails = Rails::new(
        card.clone(),
        crypto.clone(),
        shared_config.payee.clone(),
        card_config.currency,
    );

    let (events_tx, mut events_rx) = order_status_changed_channel();
    let checkout = Checkout::new(store.clone(), rails);
    let reconciler = Reconciler::new(store.clone(), card, crypto, events_tx.clone());

    // Drain status-changed events into the log. This is where a
    // notification integration would hook in.
    let events_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            tracing::info!(
                order_id = %event.order_id,
                new_status = %event.new_status,
                "order status changed"
            );
        }
    });

    // Background reconciliation poller
    let (poller_shutdown_tx, poller_shutdown_rx) = tokio::sync::watch::channel(false);
    let poller = ReconcilePoller::new(
        store.clone(),
        reconciler.clone(),
        shared_config.poller.clone(),
        poller_shutdown_rx,
    );
    let poller_task = tokio::spawn(poller.run());

    // Create application state
    let state = AppState::new(store, checkout, reconciler, shared_config, events_tx);

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop background tasks
    shutdown_notify.notify_one();
    let _ = poller_shutdown_tx.send(true);
    if let Err(e) = poller_task.await {
        tracing::error!("Poller task failed: {}", e);
    }
    events_task.abort();

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
