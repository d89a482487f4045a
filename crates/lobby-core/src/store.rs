//! The `DocumentStore` trait and its supporting types.
//!
//! The trait is implemented by storage backends (e.g. `lobby-store-json`).
//! The bot service layer depends on this abstraction, not on any concrete
//! backend.

use std::{
  collections::{BTreeMap, BTreeSet},
  future::Future,
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  record::{Fields, Record, RecordId},
};

/// The contents of one table, in insertion order.
pub type Snapshot = IndexMap<RecordId, Record>;

// ─── Table names ─────────────────────────────────────────────────────────────

/// Table names double as artifact names, so they are restricted to ASCII
/// alphanumerics, `_` and `-`.
pub fn validate_table_name(name: &str) -> Result<()> {
  let valid = !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
  if valid {
    Ok(())
  } else {
    Err(Error::InvalidTableName(name.to_owned()))
  }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

/// The outcome of testing one record against a predicate.
///
/// A predicate may return a plain `bool`, or an `Option`/`Result` when it can
/// fail on a record (a missing field, a value of the wrong type). A failed
/// evaluation excludes that record; it never aborts the scan.
pub trait Verdict {
  fn accepted(self) -> bool;
}

impl Verdict for bool {
  fn accepted(self) -> bool { self }
}

impl Verdict for Option<bool> {
  fn accepted(self) -> bool { self.unwrap_or(false) }
}

impl<E> Verdict for Result<bool, E> {
  fn accepted(self) -> bool { self.unwrap_or(false) }
}

/// A pure filter over records.
///
/// Implemented for every `Fn(&Record) -> impl Verdict` closure. Predicates
/// run while the store holds its lock and only ever see a shared borrow of
/// the record, so they cannot reach back into the store.
pub trait Predicate: Send {
  fn test(&self, record: &Record) -> bool;
}

impl<F, V> Predicate for F
where
  F: Fn(&Record) -> V + Send,
  V: Verdict,
{
  fn test(&self, record: &Record) -> bool { self(record).accepted() }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Per-table figures reported by [`DocumentStore::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
  pub record_count:     usize,
  /// Whether the table's persisted artifact currently exists.
  pub artifact_present: bool,
}

/// A point-in-time summary of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
  pub table_count: usize,
  pub tables:      BTreeMap<String, TableStats>,
  /// Backend-specific description of where data lives (e.g. a directory).
  pub location:    String,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a table-oriented document store.
///
/// Absence is never an error: reads of unknown tables or records yield
/// `None`/empty, and `update`/`delete` report it through their `bool`.
/// Errors are reserved for programming mistakes (unknown table on create,
/// duplicate IDs) and for environment failures such as I/O.
///
/// All methods return `Send` futures so the store can be shared across tasks
/// of a multi-threaded runtime.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Tables ────────────────────────────────────────────────────────────

  /// Register an empty table. Returns `false` if it already existed.
  fn create_table<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove a table and its persisted data. Returns `false` if it did not
  /// exist.
  fn drop_table<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn table_exists<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn list_tables(
    &self,
  ) -> impl Future<Output = Result<BTreeSet<String>, Self::Error>> + Send + '_;

  // ── Records ───────────────────────────────────────────────────────────

  /// Insert a new record and return its ID.
  ///
  /// A fresh unique ID is generated when `id` is `None`. Fails if the table
  /// does not exist or the ID is already taken.
  fn create<'a>(
    &'a self,
    table: &'a str,
    data: Fields,
    id: Option<RecordId>,
  ) -> impl Future<Output = Result<RecordId, Self::Error>> + Send + 'a;

  fn read<'a>(
    &'a self,
    table: &'a str,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a;

  /// A copy of every record in `table`, keyed by ID. Unknown tables yield
  /// an empty snapshot.
  fn read_all<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + 'a;

  /// Merge `data` into (or, with `merge == false`, replace the content of)
  /// an existing record. Returns `false` if the table or record is unknown.
  fn update<'a>(
    &'a self,
    table: &'a str,
    id: &'a str,
    data: Fields,
    merge: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Returns whether a record was removed.
  fn delete<'a>(
    &'a self,
    table: &'a str,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn count<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  // ── Queries ───────────────────────────────────────────────────────────

  /// Every record of `table` accepted by `predicate`, in table order.
  fn find<'a, P>(
    &'a self,
    table: &'a str,
    predicate: P,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a
  where
    P: Predicate + 'a;

  /// The first record [`find`](Self::find) would return.
  fn find_one<'a, P>(
    &'a self,
    table: &'a str,
    predicate: P,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + 'a
  where
    P: Predicate + 'a,
  {
    async move { Ok(self.find(table, predicate).await?.into_iter().next()) }
  }

  /// Records whose `field` equals `value`. A `null` value also matches
  /// records that lack the field entirely.
  fn find_by_field<'a>(
    &'a self,
    table: &'a str,
    field: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + 'a {
    self.find(table, move |record: &Record| {
      record.get(field).unwrap_or(&Value::Null) == &value
    })
  }

  // ── Maintenance ───────────────────────────────────────────────────────

  /// Persist every table, whether or not it changed.
  fn save_all(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn stats(
    &self,
  ) -> impl Future<Output = Result<StoreStats, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_names_must_be_file_safe() {
    assert!(validate_table_name("user_sessions").is_ok());
    assert!(validate_table_name("room-stats2").is_ok());
    for bad in ["", "../etc", "a/b", "with space", "dot.json"] {
      assert!(
        matches!(validate_table_name(bad), Err(Error::InvalidTableName(_))),
        "{bad:?} should be rejected"
      );
    }
  }

  #[test]
  fn verdicts_treat_failure_as_rejection() {
    assert!(true.accepted());
    assert!(!Some(false).accepted());
    assert!(!None::<bool>.accepted());
    assert!(Ok::<_, ()>(true).accepted());
    assert!(!Err::<bool, _>("boom").accepted());
  }

  #[test]
  fn closures_are_predicates() {
    let record = Record::default();
    let always = |_: &Record| true;
    let missing = |r: &Record| r.get_i64("age").map(|age| age > 18);
    assert!(always.test(&record));
    assert!(!missing.test(&record));
  }
}
