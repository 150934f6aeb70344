mod sync_cmds;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cachesync_config::AppConfig;
use cachesync_store::{LocalCache, RedbStore};
use cachesync_sync::{SyncEngine, build_remote};

const CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Parser)]
#[command(
    name = "cachesync",
    version,
    about = "Offline-first profile and history cache with best-effort cloud sync"
)]
struct Cli {
    /// Alternate config file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print this installation's client id.
    Id,
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Connect to or inspect the remote store.
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ProfileCommands {
    /// Load the profile, preferring the remote copy when reachable.
    Show,
    /// Update profile fields.
    /// Example: cachesync profile set name="Ada" theme=dark age=36
    Set {
        /// Fields as key=value pairs; values that parse as JSON are kept as JSON.
        #[arg(required = true, value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum HistoryCommands {
    /// Record a history entry.
    Add {
        /// JSON payload; anything that is not valid JSON is stored as a string.
        #[arg(value_name = "JSON")]
        payload: String,
    },
    /// Show the recent-history window.
    List {
        /// Print the cached window without contacting the remote.
        #[arg(long)]
        local: bool,
    },
    /// Upload pending entries and refresh the window.
    Sync,
    /// Entries that still carry a temporary id.
    Pending,
}

#[derive(Debug, Subcommand)]
enum RemoteCommands {
    /// Validate and store a credential file (JSON, TOML or a JS object literal).
    Connect {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Show whether the remote is configured for this session.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
    let config = AppConfig::load_from(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    debug!(path = %config_path.display(), cache = %config.cache.path, "configuration loaded");

    let store = RedbStore::open(&config.cache.path)
        .with_context(|| format!("failed to open cache at {}", config.cache.path))?;
    let cache = LocalCache::new(Arc::new(store));

    // Credentials are written before the engine exists so the remote is
    // resolved against the new blob.
    if let Commands::Remote {
        command: RemoteCommands::Connect { path },
    } = &cli.command
    {
        return sync_cmds::run_remote_connect(&cache, path);
    }

    let remote = build_remote(&cache, &config);
    let engine = SyncEngine::with_history_limit(cache.clone(), remote, config.sync.history_limit);

    match cli.command {
        Commands::Id => println!("{}", engine.client_id()),
        Commands::Profile { command } => match command {
            ProfileCommands::Show => sync_cmds::run_profile_show(&engine).await?,
            ProfileCommands::Set { fields } => sync_cmds::run_profile_set(&engine, &fields).await?,
        },
        Commands::History { command } => match command {
            HistoryCommands::Add { payload } => sync_cmds::run_history_add(&engine, &payload).await,
            HistoryCommands::List { local } => sync_cmds::run_history_list(&engine, local).await,
            HistoryCommands::Sync => sync_cmds::run_history_sync(&engine).await,
            HistoryCommands::Pending => sync_cmds::run_history_pending(&engine),
        },
        Commands::Remote { command } => match command {
            RemoteCommands::Status => sync_cmds::run_remote_status(&engine, &cache, &config),
            RemoteCommands::Connect { .. } => unreachable!("handled before the engine is built"),
        },
    }

    sync_cmds::report_failures(&engine);
    Ok(())
}
