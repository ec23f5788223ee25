//! Bookstore service entry point.
//!
//! # Responsibility
//! - Resolve layered configuration and initialize logging.
//! - Run the HTTP server, apply migrations, or print version info.

mod config;

use bookstore_api::{build_router, AppState};
use bookstore_core::db::migrations::{current_version, latest_version};
use bookstore_core::{
    open_db, open_db_in_memory, EmailNotifier, EventBus, LogEmailSender, SystemClock,
};
use clap::{Parser, Subcommand};
use config::{AppConfig, LoadedConfig};
use log::{error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "bookstore", version, about = "Bookstore catalog, loans and orders service")]
struct Cli {
    /// Configuration profile; `BOOKSTORE_PROFILE` takes precedence.
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Directory holding `bookstore.yaml` and profile files.
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Open the database and apply pending schema migrations
    Migrate,
    /// Print version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=app_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Command::Version = cli.command {
        println!(
            "bookstore {} (schema v{})",
            bookstore_core::core_version(),
            latest_version()
        );
        return Ok(());
    }

    let loaded = AppConfig::load(&cli.config_dir, cli.profile.as_deref())?;
    bookstore_core::init_logging(
        &loaded.config.logging.level,
        loaded.config.logging.dir.as_deref(),
    )?;
    info!(
        "event=config_loaded module=cli status=ok profile={} config_dir={}",
        loaded.profile,
        cli.config_dir.display()
    );

    match cli.command {
        Command::Serve => serve(&loaded),
        Command::Migrate => migrate(&loaded.config),
        Command::Version => Ok(()),
    }
}

fn open_database(config: &AppConfig) -> CliResult<Connection> {
    if config.is_in_memory() {
        warn!("event=db_open module=cli status=ok mode=memory note=data_is_not_persisted");
        return Ok(open_db_in_memory()?);
    }
    let conn = open_db(&config.database.path)?;
    info!(
        "event=db_ready module=cli status=ok path={} schema_version={}",
        config.database.path,
        current_version(&conn)?
    );
    Ok(conn)
}

fn migrate(config: &AppConfig) -> CliResult<()> {
    let conn = open_database(config)?;
    println!(
        "database {} is at schema version {} (latest {})",
        config.database.path,
        current_version(&conn)?,
        latest_version()
    );
    Ok(())
}

fn serve(loaded: &LoadedConfig) -> CliResult<()> {
    let config = &loaded.config;
    let addr = config.bind_addr()?;
    let conn = open_database(config)?;

    let mut events = EventBus::new();
    if config.notifications.email_enabled {
        events.subscribe(Arc::new(EmailNotifier::new(
            LogEmailSender,
            config.notifications.sender.clone(),
        )));
    }
    info!(
        "event=event_bus_ready module=cli status=ok listeners={}",
        events.listener_count()
    );

    let state = AppState::new(conn, events, Arc::new(SystemClock), config.loans.period_days);
    let router = build_router(state);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(
            "event=server_start module=cli status=ok bind={addr} profile={}",
            loaded.profile
        );
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    })?;
    info!("event=server_stop module=cli status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=shutdown_signal module=cli status=error error={err}");
        std::future::pending::<()>().await;
    }
    info!("event=shutdown_signal module=cli status=ok");
}
