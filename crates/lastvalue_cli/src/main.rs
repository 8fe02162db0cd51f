//! lastvalue CLI
//!
//! Command-line access to a lastvalue store.
//!
//! # Commands
//!
//! - `set` - Store a payload for a device/service
//! - `get` - Read the value at a path
//! - `ingest` - Feed one bus message through the ingestion adapter
//! - `batch` - Resolve a batch of last-value requests

mod commands;

use clap::{Parser, Subcommand};
use lastvalue_core::{Config, LastValueService};
use lastvalue_storage::{InMemoryStore, StorageSelection};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// lastvalue command-line tools.
#[derive(Parser)]
#[command(name = "lastvalue")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Override the storage selection (bolt, badger, auto)
    #[arg(global = true, short, long)]
    storage: Option<String>,

    /// Use a throwaway in-memory store instead of the configured one
    #[arg(global = true, long)]
    memory: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a payload as the last value of a device/service
    Set {
        /// Device key
        device: String,
        /// Service key
        service: String,
        /// Raw payload
        payload: String,
    },

    /// Read the last value of a device/service
    Get {
        /// Device key
        device: String,
        /// Service key
        service: String,
        /// Dotted path inside the payload
        #[arg(default_value = "")]
        path: String,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Handle one message as if it arrived on the bus
    Ingest {
        /// Topic, e.g. event/<device>/<service>
        topic: String,
        /// Raw payload
        payload: String,
    },

    /// Resolve a JSON array of last-value requests ("-" for stdin)
    Batch {
        /// Request file
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("lastvalue CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("lastvalue core v{}", lastvalue_core::VERSION);
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default().with_overrides(|name| std::env::var(name).ok()),
    };
    if let Some(selection) = cli.storage {
        config.storage_selection = StorageSelection::from(selection);
    }
    config.debug |= cli.verbose;

    let service = if cli.memory {
        LastValueService::with_store(Arc::new(InMemoryStore::new()), config.debug)
    } else {
        LastValueService::open(&config)?
    };
    let result = match cli.command {
        Commands::Set {
            device,
            service: service_key,
            payload,
        } => commands::set::run(&service, &device, &service_key, &payload),
        Commands::Get {
            device,
            service: service_key,
            path,
            format,
        } => commands::get::run(&service, &device, &service_key, &path, &format),
        Commands::Ingest { topic, payload } => commands::ingest::run(&service, &topic, &payload),
        Commands::Batch { input } => commands::batch::run(&service, &input),
        Commands::Version => Ok(()),
    };

    service.shutdown();
    result
}
