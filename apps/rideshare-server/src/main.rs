use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use rides::{RidesConfig, RidesModule};
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tower_http::timeout::TimeoutLayer;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const RIDES_MODULE: &str = "rides";

/// Rideshare Server - ride lifecycle and driver assignment API
#[derive(Parser)]
#[command(name = "rideshare-server")]
#[command(about = "Rideshare Server - ride lifecycle and driver assignment API")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config
        .logging
        .clone()
        .unwrap_or_else(runtime::default_logging_config);
    runtime::logging::init_logging_from_config(&logging_config, config.home_dir());
    tracing::info!("Rideshare Server starting");

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

async fn connect(db_config: &DatabaseConfig, config: &AppConfig) -> Result<DatabaseConnection> {
    let url = db_config.resolve_url(config.home_dir())?;
    let in_memory = url == "sqlite::memory:";

    let mut opts = ConnectOptions::new(url.clone());
    opts.max_connections(if in_memory {
        1
    } else {
        db_config.max_conns.unwrap_or(10)
    })
    .acquire_timeout(Duration::from_secs(5))
    .sqlx_logging(false);
    if let Some(ms) = db_config.busy_timeout_ms.filter(|_| db_config.is_sqlite()) {
        opts.map_sqlx_sqlite_opts(move |o| o.busy_timeout(Duration::from_millis(u64::from(ms))));
    }

    tracing::info!(in_memory, "Connecting to database");
    Database::connect(opts)
        .await
        .with_context(|| format!("Failed to connect to database '{url}'"))
}

fn build_router(module: &RidesModule, timeout_sec: u64) -> Router {
    let mut router = module.register_rest(Router::new());
    if timeout_sec > 0 {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(timeout_sec)));
    }
    apikit::request_id::with_request_tracing(router)
}

async fn run_server(config: AppConfig) -> Result<()> {
    let rides_config: RidesConfig = config.module_config(RIDES_MODULE)?;
    let db_config = config.database.clone().unwrap_or_default();

    let db = connect(&db_config, &config).await?;
    RidesModule::migrate(&db).await?;
    let module = RidesModule::new(db, rides_config)?;
    let router = build_router(&module, config.server.timeout_sec);

    let (host, port) = (config.server.host.as_str(), config.server.port);
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Rideshare Server stopped");
    Ok(())
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let rides_config: RidesConfig = config.module_config(RIDES_MODULE)?;
    rides_config
        .validate()
        .context("Invalid rides module configuration")?;
    if let Some(db) = &config.database {
        db.resolve_url(config.home_dir())?;
    }

    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
