// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Botfleet - a multi-tenant Telegram bot platform.
//!
//! Binary entry point: `serve` runs the webhook gateway, queue workers and
//! maintenance sweep; the `bot` subcommand family administers bot records.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use botfleet_config::BotfleetConfig;
use botfleet_core::BotfleetError;
use botfleet_storage::Database;
use clap::{Parser, Subcommand};

mod bot;
mod serve;

/// Botfleet - a multi-tenant Telegram bot platform.
#[derive(Parser, Debug)]
#[command(name = "botfleet", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway and queue workers.
    Serve,
    /// Administer bot records.
    Bot {
        #[command(subcommand)]
        command: bot::BotCommand,
    },
}

/// Open the configured database, creating its parent directory on first run.
pub(crate) async fn open_database(config: &BotfleetConfig) -> Result<Database, BotfleetError> {
    let path = std::path::Path::new(&config.storage.database_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BotfleetError::Storage { source: Box::new(e) })?;
        }
    }
    Database::open(&config.storage.database_path, config.storage.wal_mode).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration before dispatching any command.
    let config = match botfleet_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            botfleet_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Bot { command }) => bot::run(command, config).await,
        None => {
            println!("botfleet: use --help for available commands");
            return;
        }
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
