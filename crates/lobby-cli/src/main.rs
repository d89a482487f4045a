//! `lobby`: maintenance tool for the bot's document store.
//!
//! Reads `lobby.toml` (or the path given with `--config`), opens the JSON
//! store in the configured data directory, and runs one command against it.
//!
//! ```text
//! lobby tables
//! lobby top --limit 5 --by total_messages
//! lobby cleanup --days 14
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use lobby_bot::BotDatabase;
use lobby_core::store::DocumentStore;
use lobby_store_json::JsonStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::AppConfig;

#[derive(Parser)]
#[command(name = "lobby", author, version, about = "Lobby bot data tool")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "lobby.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// List tables with their record counts.
  Tables,
  /// Print every record of a table.
  Dump { table: String },
  /// Print one user's profile.
  User { id: String },
  /// Rank users by a numeric profile field.
  Top {
    #[arg(short, long, default_value_t = 10)]
    limit: usize,
    #[arg(long, default_value = "experience_points")]
    by:    String,
  },
  /// Command usage statistics.
  Commands {
    /// Window in days; defaults to `stats_window_days`.
    #[arg(long)]
    days: Option<u32>,
  },
  /// List a user's warnings, newest first.
  Warnings {
    user: String,
    /// Include cleared warnings.
    #[arg(long)]
    all:  bool,
  },
  /// Overview of the whole store.
  Summary,
  /// Delete finished sessions and command logs past the retention window.
  Cleanup {
    /// Age in days; defaults to `retention_days`.
    #[arg(long)]
    days: Option<u32>,
  },
  /// Rewrite every table artifact.
  Checkpoint,
  /// Drop a table and its artifact.
  Drop { table: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  let store = JsonStore::open(&cfg.data_dir)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.data_dir))?;
  let db = BotDatabase::new(Arc::new(store))
    .await
    .context("failed to initialise bot tables")?;

  run(cli.command, &cfg, &db).await
}

async fn run(
  command: Command,
  cfg: &AppConfig,
  db: &BotDatabase<JsonStore>,
) -> anyhow::Result<()> {
  let store = db.store();

  match command {
    Command::Tables => {
      let stats = store.stats().await?;
      println!("{}", stats.location);
      for (name, table) in &stats.tables {
        let artifact = if table.artifact_present { "" } else { " (no file)" };
        println!("  {name:<16} {:>8}{artifact}", table.record_count);
      }
    }
    Command::Dump { table } => {
      if !store.table_exists(&table).await? {
        anyhow::bail!("no such table: {table:?}");
      }
      print_json(&store.read_all(&table).await?)?;
    }
    Command::User { id } => {
      let profile = db
        .get_user_profile(&id)
        .await?
        .with_context(|| format!("no such user: {id:?}"))?;
      print_json(&profile)?;
    }
    Command::Top { limit, by } => {
      print_json(&db.get_top_users(limit, &by).await?)?;
    }
    Command::Commands { days } => {
      let days = days.unwrap_or(cfg.stats_window_days);
      print_json(&db.get_command_stats(days).await?)?;
    }
    Command::Warnings { user, all } => {
      print_json(&db.get_user_warnings(&user, !all).await?)?;
    }
    Command::Summary => {
      print_json(&db.get_database_summary().await?)?;
    }
    Command::Cleanup { days } => {
      let days = days.unwrap_or(cfg.retention_days);
      let removed = db.cleanup_old_data(days).await?;
      println!("removed {removed} records older than {days} days");
    }
    Command::Checkpoint => {
      store.save_all().await?;
      println!("all tables written");
    }
    Command::Drop { table } => {
      if store.drop_table(&table).await? {
        println!("dropped {table}");
      } else {
        println!("no such table: {table}");
      }
    }
  }

  Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
