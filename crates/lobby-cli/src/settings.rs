//! Operator configuration: `lobby.toml` layered with `LOBBY_*` variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Top-level configuration for the `lobby` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Directory holding one JSON artifact per table.
  #[serde(default = "default_data_dir")]
  pub data_dir:          PathBuf,
  /// Default age, in days, past which `cleanup` removes finished data.
  #[serde(default = "default_retention_days")]
  pub retention_days:    u32,
  /// Default window, in days, for `commands`.
  #[serde(default = "default_stats_window_days")]
  pub stats_window_days: u32,
}

fn default_data_dir() -> PathBuf { PathBuf::from("bot_data") }

fn default_retention_days() -> u32 { 30 }

fn default_stats_window_days() -> u32 { 7 }

impl AppConfig {
  /// Read `path` (if it exists) and the environment. A leading `~/` in
  /// `data_dir` is expanded.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("LOBBY"))
      .build()
      .with_context(|| format!("failed to read config file {path:?}"))?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;
    cfg.data_dir = expand_tilde(&cfg.data_dir);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
