//! # trellis-admin
//!
//! Maintenance tool for a Trellis store.
//!
//! - `audit` loads the whole graph, checks the ordering and page-tree
//!   invariants and prints a JSON report. Exits non-zero on violations.
//! - `purge-trash` permanently deletes trashed kanban elements older than
//!   the retention period (`TRELLIS_TRASH_RETENTION_DAYS`).

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trellis_store::Database;

use crate::config::AdminConfig;

#[derive(Debug, Parser)]
#[command(name = "trellis-admin")]
#[command(about = "Maintenance tool for a Trellis store", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database file; overrides TRELLIS_DB_PATH
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Check ordering and page-tree invariants and print a JSON report
    Audit,
    /// Permanently delete trashed elements past the retention period
    PurgeTrash,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,trellis_core=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = AdminConfig::from_env();
    if let Some(path) = cli.db {
        config.db_path = Some(path);
    }
    info!(?config, command = ?cli.command, "Loaded configuration");

    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };

    match cli.command {
        Command::Audit => {
            let report = commands::audit(&db)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_clean() {
                bail!("{} invariant violation(s) found", report.violations.len());
            }
        }
        Command::PurgeTrash => {
            let removed = commands::purge_trash(db, config.core, Utc::now())?;
            println!("removed {removed} trashed element(s)");
        }
    }

    Ok(())
}
