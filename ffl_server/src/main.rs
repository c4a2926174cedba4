//! Fantasy football playoff bracket server.
//!
//! Serves the bracket API over HTTP, backed by either an in-memory store or
//! PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use ffl_bracket::{
    bracket::BracketManager,
    db::{BracketRepository, Database, InMemoryBracketRepository},
};
use ffl_server::{
    api,
    config::{ServerConfig, StoreBackend},
    logging, metrics,
};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run a fantasy football playoff bracket server

USAGE:
  ffl_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --store      NAME        Bracket store, memory or postgres  [default: env BRACKET_STORE or memory]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --metrics-bind IP:PORT   Prometheus exporter address  [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  BRACKET_STORE            memory | postgres
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus exporter address
  TIEBREAKER_RULES         Default tiebreak order (e.g., bench,regular_season)
  PLAYOFF_START_WEEK       NFL week of round 1
  MAX_COMMIT_ATTEMPTS      Retries on concurrent bracket writes
  RUST_LOG                 Log filter
";

struct Args {
    bind: Option<SocketAddr>,
    store: Option<String>,
    database_url: Option<String>,
    metrics_bind: Option<SocketAddr>,
}

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

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        store: pargs.opt_value_from_str("--store")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
    };

    logging::init();

    let config =
        ServerConfig::from_env(args.bind, args.database_url, args.store, args.metrics_bind)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics available at http://{addr}/metrics");
    }

    let (repository, database): (Arc<dyn BracketRepository>, Option<Database>) =
        match &config.store {
            StoreBackend::Memory => {
                info!("Using in-memory bracket store; brackets are lost on restart");
                let repository: Arc<dyn BracketRepository> =
                    Arc::new(InMemoryBracketRepository::new());
                (repository, None)
            }
            StoreBackend::Postgres(db_config) => {
                info!("Connecting to database");
                let db = Database::new(db_config)
                    .await
                    .context("Failed to connect to database")?;

                let repository = db.bracket_repository();
                repository
                    .migrate()
                    .await
                    .context("Failed to create bracket schema")?;
                info!("Database connected successfully");

                let repository: Arc<dyn BracketRepository> = Arc::new(repository);
                (repository, Some(db))
            }
        };

    let defaults = &config.bracket_defaults;
    let manager = BracketManager::new(repository)
        .with_default_policy(defaults.tiebreaker.clone())
        .with_start_week(defaults.start_week)
        .with_max_commit_attempts(defaults.max_commit_attempts);

    info!(
        "Bracket defaults: tiebreak {}, round 1 in week {}",
        defaults.tiebreaker.describe(),
        defaults.start_week
    );

    let app = api::create_router(api::AppState::new(manager));

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
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }
}
