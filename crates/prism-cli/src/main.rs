//! Prism CLI - command-line host for the Prism desktop.
//!
//! Each invocation boots the desktop over the configured store, runs one
//! command and shuts the desktop down again, flushing the file index.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prism_capsule::HeadlessEngineFactory;
use prism_config::{Config, StorageBackend};
use prism_desktop::{Desktop, DesktopOptions};
use prism_telemetry::LogBuffer;

mod commands;
mod config_bridge;

use commands::{app, boot, fs};

/// Prism - a desktop environment over a key-value store
#[derive(Parser)]
#[command(name = "prism")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Persist the filesystem in this directory
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the desktop and report its state
    Boot,
    /// List a directory
    Ls {
        /// Directory path
        #[arg(default_value = "/")]
        path: String,
    },
    /// Print a file
    Cat {
        /// File path
        path: String,
    },
    /// Show a node's record
    Stat {
        /// File or directory path
        path: String,
    },
    /// Create a directory and its ancestors
    Mkdir {
        /// Directory path
        path: String,
    },
    /// Remove a file or directory tree
    Rm {
        /// File or directory path
        path: String,
    },
    /// Copy a host file into the filesystem
    Put {
        /// File on the host
        host_file: PathBuf,
        /// Destination path
        path: String,
    },
    /// Search indexed files by name
    Search {
        /// At least two characters
        query: String,
    },
    /// Install an application bundle into /home/applications
    Install {
        /// Bundle file on the host
        bundle: PathBuf,
    },
    /// Launch an application bundle
    Launch {
        /// Bundle path inside the filesystem
        path: String,
    },
    /// Pack a directory into an application bundle
    Pack {
        /// Directory holding manifest.json, index.html and main.js
        dir: PathBuf,
        /// Output bundle file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = Config::load(cli.config.as_deref())
        .context("loading configuration")?
        .config;
    if let Some(dir) = &cli.data {
        cfg.storage.backend = StorageBackend::Dir;
        cfg.storage.path = Some(dir.clone());
    }
    Ok(cfg)
}

fn setup_logging(cfg: Option<&Config>, verbose: bool, system_log: &LogBuffer) {
    let result = if let Some(cfg) = cfg {
        let mut lc = config_bridge::to_log_config(cfg);
        if verbose {
            "debug".clone_into(&mut lc.level);
        }
        prism_telemetry::setup_logging(&lc, Some(system_log.clone()))
    } else {
        // Fallback if config loading fails.
        prism_telemetry::setup_default_logging()
    };
    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {e}");
    }
}

async fn open_desktop(cfg: &Config) -> Result<Desktop> {
    tracing::debug!(backend = ?cfg.storage.backend, assets = ?cfg.assets.source, "Opening desktop");
    let store = prism_desktop::open_store(cfg)
        .await
        .context("opening storage")?;
    let assets = prism_desktop::asset_source(cfg).context("configuring asset source")?;
    Ok(Desktop::boot(
        store,
        assets,
        Arc::new(HeadlessEngineFactory::new()),
        DesktopOptions::from_config(cfg),
    )
    .await)
}

async fn run(command: Commands, desktop: &Desktop, system_log: &LogBuffer) -> Result<()> {
    if let Commands::Boot = command {
        boot::status(desktop);
        return boot::ensure_running(desktop, system_log);
    }
    boot::ensure_running(desktop, system_log)?;
    match command {
        Commands::Ls { path } => fs::ls(desktop, &path).await,
        Commands::Cat { path } => fs::cat(desktop, &path).await,
        Commands::Stat { path } => fs::stat(desktop, &path).await,
        Commands::Mkdir { path } => fs::mkdir(desktop, &path).await,
        Commands::Rm { path } => fs::rm(desktop, &path).await,
        Commands::Put { host_file, path } => fs::put(desktop, &host_file, &path).await,
        Commands::Search { query } => {
            fs::search(desktop, &query);
            Ok(())
        },
        Commands::Install { bundle } => app::install(desktop, &bundle).await,
        Commands::Launch { path } => app::launch(desktop, &path).await,
        Commands::Boot | Commands::Pack { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let system_log = LogBuffer::default();

    let cfg = load_config(&cli);
    setup_logging(cfg.as_ref().ok(), cli.verbose, &system_log);

    if let Commands::Pack { dir, output } = &cli.command {
        return app::pack(dir, output);
    }

    let cfg = cfg?;
    let desktop = open_desktop(&cfg).await?;
    let result = run(cli.command, &desktop, &system_log).await;
    desktop.shutdown().await.context("shutting down")?;
    result
}
