//! Table persistence: one pretty-printed JSON artifact per table.
//!
//! Saves truncate and rewrite the whole file. There is no atomic swap, so an
//! interrupted write can leave a truncated artifact; loading treats any
//! artifact that fails to parse as an empty table.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use chrono::Utc;
use indexmap::IndexMap;
use lobby_core::{Fields, Record, Snapshot, store::validate_table_name};
use tracing::{debug, warn};

use crate::{Error, Result};

const EXTENSION: &str = "json";

/// Maps table names to artifact files inside a root directory.
#[derive(Debug, Clone)]
pub struct TableFiles {
  root: PathBuf,
}

impl TableFiles {
  /// Use `root` as the storage directory, creating it if absent.
  pub async fn init(root: impl Into<PathBuf>) -> Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root)
      .await
      .map_err(Error::io(&root))?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path { &self.root }

  pub fn path_for(&self, table: &str) -> PathBuf {
    self.root.join(format!("{table}.{EXTENSION}"))
  }

  /// Names of every table that has an artifact in the root directory, sorted.
  pub async fn discover(&self) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(&self.root)
      .await
      .map_err(Error::io(&self.root))?;

    let mut names = Vec::new();
    while let Some(entry) =
      entries.next_entry().await.map_err(Error::io(&self.root))?
    {
      let path = entry.path();
      if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
        continue;
      }
      let is_file = entry
        .file_type()
        .await
        .map_err(Error::io(&path))?
        .is_file();
      let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
        continue;
      };
      if !is_file || validate_table_name(name).is_err() {
        debug!(?path, "ignoring entry that is not a table artifact");
        continue;
      }
      names.push(name.to_owned());
    }

    names.sort();
    Ok(names)
  }

  /// Read a table's records. An absent, unreadable or malformed artifact
  /// yields an empty table.
  ///
  /// Records whose metadata had to be re-stamped are counted in
  /// [`Loaded::repaired`]; the artifact itself is left untouched.
  pub async fn load(&self, table: &str) -> Loaded {
    let path = self.path_for(table);
    let bytes = match tokio::fs::read(&path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == ErrorKind::NotFound => return Loaded::default(),
      Err(e) => {
        warn!(?path, error = %e, "unreadable table artifact; loading as empty");
        return Loaded::default();
      }
    };

    match decode_snapshot(table, &bytes) {
      Ok(loaded) => loaded,
      Err(e) => {
        warn!(?path, error = %e, "corrupt table artifact; loading as empty");
        Loaded::default()
      }
    }
  }

  /// Replace the table's artifact with `records`.
  pub async fn save(&self, table: &str, records: &Snapshot) -> Result<()> {
    let path = self.path_for(table);
    let bytes = serde_json::to_vec_pretty(records)?;
    tokio::fs::write(&path, bytes)
      .await
      .map_err(Error::io(&path))?;
    debug!(table, records = records.len(), "table persisted");
    Ok(())
  }

  /// Delete the table's artifact. Returns whether one existed.
  pub async fn remove(&self, table: &str) -> Result<bool> {
    let path = self.path_for(table);
    match tokio::fs::remove_file(&path).await {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
      Err(e) => Err(Error::io(path)(e)),
    }
  }

  pub async fn exists(&self, table: &str) -> bool {
    tokio::fs::try_exists(self.path_for(table))
      .await
      .unwrap_or(false)
  }
}

/// A table as read from its artifact.
#[derive(Debug, Default)]
pub struct Loaded {
  pub records:  Snapshot,
  /// How many records had their metadata re-stamped while loading.
  pub repaired: usize,
}

fn decode_snapshot(table: &str, bytes: &[u8]) -> Result<Loaded> {
  let raw: IndexMap<String, Fields> = serde_json::from_slice(bytes)?;
  let now = Utc::now();
  let mut loaded = Loaded::default();
  for (id, fields) in raw {
    let (record, repaired) = Record::restore(&id, fields, now);
    if repaired {
      warn!(table, %id, "re-stamped missing or invalid record metadata");
      loaded.repaired += 1;
    }
    loaded.records.insert(id, record);
  }
  Ok(loaded)
}
