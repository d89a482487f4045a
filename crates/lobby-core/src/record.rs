//! Records: the open field mappings held in every table.
//!
//! A record is schema-less: any JSON object is accepted as content. On top of
//! that content the store alone manages three reserved fields:
//!
//! | Field         | Meaning                                     |
//! |---------------|---------------------------------------------|
//! | `_id`         | equal to the record's key in its table      |
//! | `_created_at` | RFC 3339 UTC; set once, at creation         |
//! | `_updated_at` | RFC 3339 UTC; refreshed on every mutation   |
//!
//! Callers can never write these fields: they are stripped from every
//! payload before it reaches a record.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Key of a record within its table.
pub type RecordId = String;

/// An open field-name → value mapping.
pub type Fields = Map<String, Value>;

// ─── Reserved fields ─────────────────────────────────────────────────────────

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "_created_at";
pub const UPDATED_AT_FIELD: &str = "_updated_at";

pub const RESERVED_FIELDS: [&str; 3] =
  [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

pub fn is_reserved(field: &str) -> bool { RESERVED_FIELDS.contains(&field) }

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Timestamp(format!("{s:?}: {e}")))
}

// ─── Conversion ──────────────────────────────────────────────────────────────

/// Serialise `value` into a field mapping usable as a record payload.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
  match serde_json::to_value(value)? {
    Value::Object(fields) => Ok(fields),
    _ => Err(Error::NotAnObject),
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// The store-managed part of a record, decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
  #[serde(rename = "_id")]
  pub id:         RecordId,
  #[serde(rename = "_created_at")]
  pub created_at: DateTime<Utc>,
  #[serde(rename = "_updated_at")]
  pub updated_at: DateTime<Utc>,
}

/// A record decoded into a typed model, bundled with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Stored<T> {
  #[serde(flatten)]
  pub meta:  Metadata,
  #[serde(flatten)]
  pub value: T,
}

impl<T> Stored<T> {
  pub fn id(&self) -> &str { &self.meta.id }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A single document: caller content plus the reserved metadata fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Fields);

impl Record {
  /// Build a freshly created record keyed by `id`.
  pub fn stamped(id: &str, data: Fields, now: DateTime<Utc>) -> Self {
    let mut fields = without_reserved(data);
    let stamp = encode_dt(now);
    fields.insert(ID_FIELD.into(), Value::String(id.to_owned()));
    fields.insert(CREATED_AT_FIELD.into(), Value::String(stamp.clone()));
    fields.insert(UPDATED_AT_FIELD.into(), Value::String(stamp));
    Self(fields)
  }

  /// Rebuild a record read back from storage under key `id`.
  ///
  /// Metadata that is missing, malformed, or inconsistent with the key is
  /// re-stamped. The second element reports whether anything was repaired.
  pub fn restore(id: &str, fields: Fields, now: DateTime<Utc>) -> (Self, bool) {
    let mut record = Self(fields);
    let mut repaired = false;

    if record.id() != Some(id) {
      record.0.insert(ID_FIELD.into(), Value::String(id.to_owned()));
      repaired = true;
    }

    let created = match record.created_at() {
      Some(created) => created,
      None => {
        record
          .0
          .insert(CREATED_AT_FIELD.into(), Value::String(encode_dt(now)));
        repaired = true;
        now
      }
    };

    if record.updated_at().is_none_or(|updated| updated < created) {
      record
        .0
        .insert(UPDATED_AT_FIELD.into(), Value::String(encode_dt(created)));
      repaired = true;
    }

    (record, repaired)
  }

  // ── Metadata ────────────────────────────────────────────────────────────

  pub fn id(&self) -> Option<&str> { self.get_str(ID_FIELD) }

  pub fn created_at(&self) -> Option<DateTime<Utc>> {
    self.get_dt(CREATED_AT_FIELD)
  }

  pub fn updated_at(&self) -> Option<DateTime<Utc>> {
    self.get_dt(UPDATED_AT_FIELD)
  }

  /// All three metadata fields, or `None` if any is absent or malformed.
  pub fn metadata(&self) -> Option<Metadata> {
    Some(Metadata {
      id:         self.id()?.to_owned(),
      created_at: self.created_at()?,
      updated_at: self.updated_at()?,
    })
  }

  // ── Field access ────────────────────────────────────────────────────────

  pub fn get(&self, field: &str) -> Option<&Value> { self.0.get(field) }

  pub fn get_str(&self, field: &str) -> Option<&str> { self.get(field)?.as_str() }

  pub fn get_i64(&self, field: &str) -> Option<i64> { self.get(field)?.as_i64() }

  pub fn get_f64(&self, field: &str) -> Option<f64> { self.get(field)?.as_f64() }

  pub fn get_bool(&self, field: &str) -> Option<bool> {
    self.get(field)?.as_bool()
  }

  /// Parse a string field as an RFC 3339 timestamp.
  pub fn get_dt(&self, field: &str) -> Option<DateTime<Utc>> {
    decode_dt(self.get_str(field)?).ok()
  }

  /// True if `field` is absent or explicitly `null`.
  pub fn is_unset(&self, field: &str) -> bool {
    self.get(field).is_none_or(Value::is_null)
  }

  pub fn fields(&self) -> &Fields { &self.0 }

  pub fn into_fields(self) -> Fields { self.0 }

  /// The caller-owned content, without metadata.
  pub fn content(&self) -> Fields {
    self
      .0
      .iter()
      .filter(|(k, _)| !is_reserved(k))
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect()
  }

  // ── Mutation ────────────────────────────────────────────────────────────

  /// Shallow-merge `data` into the record: new keys are added, existing keys
  /// overwritten. `_updated_at` is refreshed.
  pub fn merge(&mut self, data: Fields, now: DateTime<Utc>) {
    for (key, value) in without_reserved(data) {
      self.0.insert(key, value);
    }
    self.touch(now);
  }

  /// Replace all content with `data`, keeping `_id` and `_created_at`.
  /// `_updated_at` is refreshed.
  pub fn replace(&mut self, data: Fields, now: DateTime<Utc>) {
    let mut fields = without_reserved(data);
    for key in [ID_FIELD, CREATED_AT_FIELD] {
      if let Some(value) = self.0.remove(key) {
        fields.insert(key.into(), value);
      }
    }
    self.0 = fields;
    self.touch(now);
  }

  /// `_updated_at` never precedes `_created_at`, even if the clock stepped
  /// backwards between the two writes.
  fn touch(&mut self, now: DateTime<Utc>) {
    let now = self.created_at().map_or(now, |created| now.max(created));
    self
      .0
      .insert(UPDATED_AT_FIELD.into(), Value::String(encode_dt(now)));
  }

  // ── Typed views ─────────────────────────────────────────────────────────

  /// Decode the content into `T`, alongside the record's metadata.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<Stored<T>> {
    let meta = self.metadata().ok_or_else(|| {
      Error::MissingMetadata(self.id().unwrap_or_default().to_owned())
    })?;
    let value = serde_json::from_value(Value::Object(self.content()))?;
    Ok(Stored { meta, value })
  }
}

impl From<Record> for Value {
  fn from(record: Record) -> Self { Value::Object(record.0) }
}

fn without_reserved(data: Fields) -> Fields {
  data.into_iter().filter(|(k, _)| !is_reserved(k)).collect()
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};
  use serde::Deserialize;
  use serde_json::json;

  use super::*;

  fn fields(value: Value) -> Fields {
    match value {
      Value::Object(map) => map,
      other => panic!("not an object: {other}"),
    }
  }

  fn at(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

  #[test]
  fn stamped_sets_metadata_and_strips_reserved_keys() {
    let data = fields(json!({
      "name": "Ann",
      "_id": "forged",
      "_created_at": "1999-01-01T00:00:00Z",
    }));
    let record = Record::stamped("u1", data, at(1_000));

    assert_eq!(record.id(), Some("u1"));
    assert_eq!(record.created_at(), Some(at(1_000)));
    assert_eq!(record.updated_at(), Some(at(1_000)));
    assert_eq!(record.get_str("name"), Some("Ann"));
  }

  #[test]
  fn merge_keeps_untouched_fields() {
    let mut record =
      Record::stamped("u1", fields(json!({ "name": "Ann", "age": 20 })), at(0));
    record.merge(fields(json!({ "age": 30, "_created_at": "bogus" })), at(60));

    assert_eq!(record.get_str("name"), Some("Ann"));
    assert_eq!(record.get_i64("age"), Some(30));
    assert_eq!(record.created_at(), Some(at(0)));
    assert_eq!(record.updated_at(), Some(at(60)));
  }

  #[test]
  fn replace_drops_old_content_but_keeps_identity() {
    let mut record =
      Record::stamped("u1", fields(json!({ "name": "Ann", "age": 20 })), at(0));
    record.replace(fields(json!({ "nick": "A" })), at(60));

    assert_eq!(record.content(), fields(json!({ "nick": "A" })));
    assert_eq!(record.id(), Some("u1"));
    assert_eq!(record.created_at(), Some(at(0)));
    assert_eq!(record.updated_at(), Some(at(60)));
  }

  #[test]
  fn updated_at_never_precedes_created_at() {
    let mut record = Record::stamped("u1", Fields::new(), at(100));
    record.merge(Fields::new(), at(100) - Duration::seconds(30));
    assert_eq!(record.updated_at(), Some(at(100)));
  }

  #[test]
  fn restore_repairs_missing_metadata() {
    let (record, repaired) =
      Record::restore("k", fields(json!({ "name": "Ann" })), at(5));
    assert!(repaired);
    assert_eq!(record.id(), Some("k"));
    assert_eq!(record.created_at(), Some(at(5)));
    assert_eq!(record.updated_at(), Some(at(5)));
  }

  #[test]
  fn restore_leaves_valid_records_alone() {
    let original = Record::stamped("k", fields(json!({ "x": 1 })), at(5));
    let (record, repaired) =
      Record::restore("k", original.clone().into_fields(), at(99));
    assert!(!repaired);
    assert_eq!(record, original);
  }

  #[test]
  fn decode_separates_metadata_from_content() {
    #[derive(Deserialize)]
    struct Person {
      name: String,
      #[serde(flatten)]
      rest: Fields,
    }

    let record =
      Record::stamped("u1", fields(json!({ "name": "Ann", "age": 3 })), at(0));
    let stored = record.decode::<Person>().unwrap();

    assert_eq!(stored.id(), "u1");
    assert_eq!(stored.value.name, "Ann");
    assert_eq!(stored.value.rest, fields(json!({ "age": 3 })));
  }

  #[test]
  fn to_fields_rejects_non_objects() {
    assert!(matches!(to_fields(&42), Err(Error::NotAnObject)));
  }
}
