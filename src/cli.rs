//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvTradeReader;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::domain::error::JournalError;
use crate::ports::config_port::ConfigPort;
use crate::services::{AccountService, TradeJournal};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

#[derive(Parser, Debug)]
#[command(name = "tradejournal", about = "Personal crypto trade journal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the database schema
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Bulk-import trades for a user from a CSV file
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        email: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Recompute P&L for every trade of a user that has an exit price
    Recalculate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        email: String,
    },
    /// Print detailed statistics for a user as JSON
    Stats {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        email: String,
    },
    /// Print a random hex value for `[auth] session_secret`
    GenSecret,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::InitDb { config } => run_init_db(&config),
        Command::Import {
            config,
            email,
            file,
        } => run_import(&config, &email, &file),
        Command::Recalculate { config, email } => run_recalculate(&config, &email),
        Command::Stats { config, email } => run_stats(&config, &email),
        Command::GenSecret => run_gen_secret(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// `RUST_LOG` wins over `[log] level`; default is `info`. Safe to call twice.
pub fn init_logging(config: Option<&dyn ConfigPort>) {
    let level = config
        .and_then(|c| c.get_string("log", "level"))
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, JournalError> {
    let config = FileConfigAdapter::from_file(path)?;
    init_logging(Some(&config as &dyn ConfigPort));
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

pub fn open_store(config: &dyn ConfigPort) -> Result<Arc<SqliteAdapter>, JournalError> {
    let store = SqliteAdapter::from_config(config)?;
    store.initialize_schema()?;
    Ok(Arc::new(store))
}

fn services(store: Arc<SqliteAdapter>) -> (TradeJournal, AccountService) {
    (TradeJournal::new(store.clone()), AccountService::new(store))
}

/// Import a CSV file for the account registered under `email`.
/// Returns how many trades were written.
pub fn import_file(
    config: &dyn ConfigPort,
    email: &str,
    file: &Path,
) -> Result<usize, JournalError> {
    let (journal, accounts) = services(open_store(config)?);
    let account = accounts.find_by_email(email)?;
    let rows = CsvTradeReader::from_path(file)?;
    Ok(journal.import_trades(account.id, rows)?.len())
}

pub fn recalculate(config: &dyn ConfigPort, email: &str) -> Result<usize, JournalError> {
    let (journal, accounts) = services(open_store(config)?);
    let account = accounts.find_by_email(email)?;
    journal.recalculate_all(account.id)
}

pub fn stats_json(config: &dyn ConfigPort, email: &str) -> Result<String, JournalError> {
    let (journal, accounts) = services(open_store(config)?);
    let account = accounts.find_by_email(email)?;
    let stats = journal.detailed_stats(account.id)?;
    serde_json::to_string_pretty(&stats).map_err(|e| JournalError::Io(e.into()))
}

fn run_init_db(config_path: &Path) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    open_store(&config)?;
    eprintln!("Database schema is ready");
    Ok(())
}

fn run_import(config_path: &Path, email: &str, file: &Path) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let count = import_file(&config, email, file)?;
    eprintln!("Imported {count} trades from {}", file.display());
    Ok(())
}

fn run_recalculate(config_path: &Path, email: &str) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let updated = recalculate(&config, email)?;
    println!("Recalculated P&L for {updated} trades");
    Ok(())
}

fn run_stats(config_path: &Path, email: &str) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    println!("{}", stats_json(&config, email)?);
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), JournalError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use std::net::SocketAddr;

        let config = load_config(config_path)?;
        let (journal, accounts) = services(open_store(&config)?);

        let listen = config
            .get_string("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let addr: SocketAddr = listen.parse().map_err(|_| JournalError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: format!("not a socket address: {listen}"),
        })?;

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let router = build_router(AppState { journal, accounts }, &config).await?;
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, "listening");
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown_signal())
            .await?;
            Ok::<(), JournalError>(())
        })?;

        tracing::info!("server stopped");
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(JournalError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "built without the web feature".into(),
        })
    }
}

#[cfg(feature = "web")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}

fn run_gen_secret() -> Result<(), JournalError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::SESSION_KEY_LEN;
        use rand::RngCore;

        let mut bytes = [0u8; SESSION_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        println!("{}", hex::encode(bytes));
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        Err(JournalError::ConfigInvalid {
            section: "auth".into(),
            key: "session_secret".into(),
            reason: "built without the web feature".into(),
        })
    }
}
