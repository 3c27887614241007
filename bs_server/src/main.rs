//! Chat mini-game ledger server.
//!
//! Serves the intent API for the bot front end and runs the payment
//! reconciler in the background.

use anyhow::{Context, Error};
use betsmile::admin::AdminIds;
use betsmile::bot::Dispatcher;
use betsmile::db::Database;
use betsmile::ledger::{MemoryStore, Store};
use betsmile::notify::{LogNotifier, Notifier, WebhookNotifier};
use betsmile::payments::CryptoCloudClient;
use betsmile::settings::SettingsHandle;
use bs_server::api::{self, AppState};
use bs_server::config::{ServerConfig, load_game_settings};
use bs_server::{logging, metrics};
use log::info;
use pico_args::Arguments;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const HELP: &str = "\
Run the chat mini-game ledger server

USAGE:
  bs_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/betsmile]

FLAGS:
  --memory                 Keep the ledger in memory (development only)
  -h, --help               Print help information

ENVIRONMENT:
  FRONTEND_TOKEN           Bearer token the bot front end presents (required)
  ADMIN_IDS                Comma-separated admin account ids (required)
  CRYPTOCLOUD_API_KEY      Payment provider API key (required)
  CRYPTOCLOUD_SHOP_ID      Payment provider shop id (required)
  (See .env.example at the workspace root for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let use_memory = pargs.contains("--memory");
    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    logging::init();

    let config = ServerConfig::from_env(bind, database_url, use_memory)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics at http://{addr}/metrics");
    }

    if config.use_memory {
        log::warn!("Using the in-memory ledger; balances are lost on shutdown");
        serve(Arc::new(MemoryStore::new()), config).await
    } else {
        info!("Connecting to database");
        let db = Database::connect(&config.database)
            .await
            .context("Failed to connect to or migrate the database")?;
        info!("Database connected and migrated");

        serve(Arc::new(db.ledger()), config).await
    }
}

async fn serve<S: Store + 'static>(store: Arc<S>, config: ServerConfig) -> Result<(), Error> {
    let settings =
        SettingsHandle::new(load_game_settings(&*store, config.game_defaults.clone()).await?);

    let provider = Arc::new(CryptoCloudClient::new(config.payments.cryptocloud())?);

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(config.notify_timeout_secs),
        )?),
        None => Arc::new(LogNotifier),
    };
    let notifier = Arc::new(metrics::MeteredNotifier::new(notifier));

    let admins = AdminIds::new(config.security.admin_ids.iter().copied());
    info!("{} admin account(s) configured", admins.len());

    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        settings,
        provider,
        notifier,
        admins,
    ));

    // Background reconciler, stopped with the HTTP server
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = tokio::spawn(
        dispatcher
            .reconciler()
            .run(config.payments.reconcile_interval(), shutdown_rx),
    );
    info!(
        "Payment reconciler running every {}s",
        config.payments.reconcile_interval_secs
    );

    let app = api::create_router(AppState::new(
        dispatcher,
        store,
        &config.security.frontend_token,
    ));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    let _ = shutdown_tx.send(true);
    reconciler.await.context("Reconciler task failed")?;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
