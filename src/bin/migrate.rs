//! Schema migration CLI.
//!
//! `splitsphere-migrate offline` prints the DDL script for review without connecting.
//! `splitsphere-migrate online` applies pending changes to `DATABASE_URL` in one transaction.

use clap::{Parser, Subcommand};
use splitsphere::{logging, metadata, MigrationMode, MigrationOutcome, Migrator, Settings};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "splitsphere-migrate", version, about = "Render or apply the SplitSphere schema")]
struct Cli {
    /// Read settings overrides from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// Target connection string (defaults to DATABASE_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Emit SQL without executing it
    Offline {
        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Connect and apply pending changes
    Online,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = match &cli.env_file {
        Some(path) => Settings::from_env_file(path)?,
        None => Settings::load()?,
    };
    logging::init(&settings);

    let metadata = metadata();
    let migrator = match &cli.url {
        Some(url) => Migrator::new(&metadata, url)?,
        None => Migrator::from_settings(&metadata, &settings)?,
    };

    let (mode, output) = match cli.mode {
        Mode::Offline { output } => (MigrationMode::Offline, output),
        Mode::Online => (MigrationMode::Online, None),
    };
    tracing::info!(dialect = %migrator.dialect(), ?mode, "running migrations");

    match migrator.run(mode).await? {
        MigrationOutcome::Script(sql) => match output {
            Some(path) => {
                std::fs::write(&path, sql)?;
                tracing::info!("wrote {}", path.display());
            }
            None => print!("{}", sql),
        },
        MigrationOutcome::Applied(report) if report.is_empty() => {
            tracing::info!("schema already up to date");
        }
        MigrationOutcome::Applied(report) => {
            for table in &report.created_tables {
                tracing::info!(%table, "created table");
            }
            for (table, column) in &report.added_columns {
                tracing::info!(%table, %column, "added column");
            }
        }
    }
    Ok(())
}
