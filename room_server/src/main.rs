//! Multi-table poker room server.
//!
//! Spawns one table actor per configured table and serves the HTTP and
//! WebSocket API in front of them.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use poker_room::{
    db::{Database, MemoryTableStore, MemoryWallet, PgTableStore, TableStore, WalletStore},
    table::{EventBus, TableManager},
    wallet::WalletManager,
};
use room_server::{
    api,
    config::{Overrides, ServerConfig, StorageMode},
    logging,
};
use tracing::{error, info, warn};

const HELP: &str = "\
Run a multi-table poker room server

USAGE:
  room_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --tables     N           Number of tables to create  [default: env MAX_TABLES or 1]

FLAGS:
  --memory                 Keep tables and wallets in memory instead of PostgreSQL
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STORAGE                  postgres or memory
  DATABASE_URL             PostgreSQL connection string
  TABLE_SMALL_BLIND        Small blind for startup tables
  TABLE_BIG_BLIND          Big blind for startup tables
  TABLE_SPEED              normal, turbo or hyper
  RUST_LOG                 Log filter [default: info,sqlx=warn]
  (See .env.example for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let overrides = Overrides {
        memory: pargs.contains("--memory"),
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        num_tables: pargs.opt_value_from_str("--tables")?,
    };

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;
    info!(bind = %config.bind, tables = config.num_tables, "Starting poker room server");

    let events = Arc::new(EventBus::new());
    let (store, wallet, database): (Arc<dyn TableStore>, Arc<dyn WalletStore>, Option<Database>) =
        match &config.storage {
            StorageMode::Postgres(db_config) => {
                let db = Database::new(db_config)
                    .await
                    .context("Failed to connect to database")?;
                db.ensure_schema()
                    .await
                    .context("Failed to create database schema")?;
                info!("Database connected successfully");

                let pool = db.pool().clone();
                (
                    Arc::new(PgTableStore::new(pool.clone())),
                    Arc::new(WalletManager::new(pool)),
                    Some(db),
                )
            }
            StorageMode::Memory => {
                warn!("Running on in-memory storage; nothing survives a restart");
                (
                    Arc::new(MemoryTableStore::new()),
                    Arc::new(MemoryWallet::new()),
                    None,
                )
            }
        };

    let table_manager = Arc::new(TableManager::new(store, wallet, events));

    for index in 0..config.num_tables {
        let table_id = index as i64 + 1;
        match table_manager
            .create_table(table_id, config.table_config(index))
            .await
        {
            Ok(_) => info!(table_id, "Created table"),
            Err(e) => error!(table_id, error = %e, "Failed to create table"),
        }
    }

    for table in table_manager.list_tables().await {
        info!(
            "  - {} (ID: {}) - {}/{} players, blinds: {}/{}, {}",
            table.name,
            table.table_id,
            table.player_count,
            table.max_players,
            table.blinds.small,
            table.blinds.big,
            table.speed
        );
    }

    let app = api::create_router(api::AppState::new(table_manager.clone(), database));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!("Server is running at http://{}. Press Ctrl+C to stop.", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    for index in 0..config.num_tables {
        let table_id = index as i64 + 1;
        if let Err(e) = table_manager.close_table(table_id).await {
            warn!(table_id, error = %e, "Table did not close cleanly");
        }
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for CTRL+C");
        std::future::pending::<()>().await;
    }
}
