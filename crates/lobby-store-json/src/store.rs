//! [`JsonStore`], the JSON-snapshot implementation of [`DocumentStore`].

use std::{
  collections::{BTreeMap, BTreeSet},
  path::{Path, PathBuf},
  sync::Arc,
};

use chrono::Utc;
use lobby_core::{
  Fields, Record, RecordId, Snapshot,
  store::{DocumentStore, Predicate, StoreStats, TableStats, validate_table_name},
};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Error, Result, persist::TableFiles};

type Tables = BTreeMap<String, Snapshot>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A document store held in memory and mirrored to one JSON file per table.
///
/// Every operation, reads included, runs under a single store-wide lock, and
/// mutations rewrite the affected table's file before releasing it. Callers
/// therefore never observe a half-persisted table. The lock is coarse: one
/// slow scan or write delays every other table too.
///
/// Cloning is cheap; clones share the same tables.
#[derive(Clone)]
pub struct JsonStore {
  files:  TableFiles,
  tables: Arc<Mutex<Tables>>,
}

impl JsonStore {
  /// Open (or create) a store rooted at `root`, loading every table artifact
  /// found there. Tables with re-stamped records are saved straight away.
  pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
    let files = TableFiles::init(root).await?;

    let mut tables = Tables::new();
    for name in files.discover().await? {
      let loaded = files.load(&name).await;
      if loaded.repaired > 0 {
        files.save(&name, &loaded.records).await?;
        info!(
          table = %name,
          repaired = loaded.repaired,
          "re-stamped records written back"
        );
      }
      tables.insert(name, loaded.records);
    }

    info!(root = ?files.root(), tables = tables.len(), "document store opened");
    Ok(Self { files, tables: Arc::new(Mutex::new(tables)) })
  }

  pub fn root(&self) -> &Path { self.files.root() }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for JsonStore {
  type Error = Error;

  // ── Tables ────────────────────────────────────────────────────────────────

  async fn create_table(&self, table: &str) -> Result<bool> {
    validate_table_name(table)?;
    let mut tables = self.tables.lock().await;
    if tables.contains_key(table) {
      return Ok(false);
    }

    let records = tables.entry(table.to_owned()).or_default();
    self.files.save(table, records).await?;
    debug!(table, "table created");
    Ok(true)
  }

  async fn drop_table(&self, table: &str) -> Result<bool> {
    let mut tables = self.tables.lock().await;
    if tables.remove(table).is_none() {
      return Ok(false);
    }

    self.files.remove(table).await?;
    debug!(table, "table dropped");
    Ok(true)
  }

  async fn table_exists(&self, table: &str) -> Result<bool> {
    Ok(self.tables.lock().await.contains_key(table))
  }

  async fn list_tables(&self) -> Result<BTreeSet<String>> {
    Ok(self.tables.lock().await.keys().cloned().collect())
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn create(
    &self,
    table: &str,
    data:  Fields,
    id:    Option<RecordId>,
  ) -> Result<RecordId> {
    let mut tables = self.tables.lock().await;
    let records = tables
      .get_mut(table)
      .ok_or_else(|| lobby_core::Error::NoSuchTable(table.to_owned()))?;

    let id = id.unwrap_or_else(|| Uuid::now_v7().to_string());
    if records.contains_key(&id) {
      return Err(
        lobby_core::Error::DuplicateId { table: table.to_owned(), id }.into(),
      );
    }

    records.insert(id.clone(), Record::stamped(&id, data, Utc::now()));
    self.files.save(table, records).await?;
    debug!(table, %id, "record created");
    Ok(id)
  }

  async fn read(&self, table: &str, id: &str) -> Result<Option<Record>> {
    let tables = self.tables.lock().await;
    Ok(tables.get(table).and_then(|t| t.get(id)).cloned())
  }

  async fn read_all(&self, table: &str) -> Result<Snapshot> {
    let tables = self.tables.lock().await;
    Ok(tables.get(table).cloned().unwrap_or_default())
  }

  async fn update(
    &self,
    table: &str,
    id:    &str,
    data:  Fields,
    merge: bool,
  ) -> Result<bool> {
    let mut tables = self.tables.lock().await;
    let Some(records) = tables.get_mut(table) else {
      return Ok(false);
    };
    let Some(record) = records.get_mut(id) else {
      return Ok(false);
    };

    if merge {
      record.merge(data, Utc::now());
    } else {
      record.replace(data, Utc::now());
    }

    self.files.save(table, records).await?;
    debug!(table, id, merge, "record updated");
    Ok(true)
  }

  async fn delete(&self, table: &str, id: &str) -> Result<bool> {
    let mut tables = self.tables.lock().await;
    let Some(records) = tables.get_mut(table) else {
      return Ok(false);
    };
    // `shift_remove` keeps the remaining records in insertion order.
    if records.shift_remove(id).is_none() {
      return Ok(false);
    }

    self.files.save(table, records).await?;
    debug!(table, id, "record deleted");
    Ok(true)
  }

  async fn count(&self, table: &str) -> Result<usize> {
    let tables = self.tables.lock().await;
    Ok(tables.get(table).map_or(0, Snapshot::len))
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  async fn find<'a, P>(&'a self, table: &'a str, predicate: P) -> Result<Vec<Record>>
  where
    P: Predicate + 'a,
  {
    let tables = self.tables.lock().await;
    let Some(records) = tables.get(table) else {
      return Ok(Vec::new());
    };

    Ok(
      records
        .values()
        .filter(|record| predicate.test(record))
        .cloned()
        .collect(),
    )
  }

  async fn find_one<'a, P>(
    &'a self,
    table: &'a str,
    predicate: P,
  ) -> Result<Option<Record>>
  where
    P: Predicate + 'a,
  {
    let tables = self.tables.lock().await;
    Ok(
      tables
        .get(table)
        .and_then(|records| records.values().find(|record| predicate.test(record)))
        .cloned(),
    )
  }

  // ── Maintenance ───────────────────────────────────────────────────────────

  async fn save_all(&self) -> Result<()> {
    let tables = self.tables.lock().await;
    for (name, records) in tables.iter() {
      self.files.save(name, records).await?;
    }
    debug!(tables = tables.len(), "all tables persisted");
    Ok(())
  }

  async fn stats(&self) -> Result<StoreStats> {
    let tables = self.tables.lock().await;
    let mut per_table = BTreeMap::new();
    for (name, records) in tables.iter() {
      per_table.insert(name.clone(), TableStats {
        record_count:     records.len(),
        artifact_present: self.files.exists(name).await,
      });
    }

    Ok(StoreStats {
      table_count: tables.len(),
      tables:      per_table,
      location:    self.files.root().display().to_string(),
    })
  }
}
