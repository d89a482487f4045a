//! Error types for `lobby-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("table does not exist: {0:?}")]
  NoSuchTable(String),

  #[error("record {id:?} already exists in table {table:?}")]
  DuplicateId { table: String, id: String },

  #[error("invalid table name: {0:?}")]
  InvalidTableName(String),

  #[error("invalid timestamp: {0}")]
  Timestamp(String),

  #[error("record {0:?} is missing store metadata")]
  MissingMetadata(String),

  #[error("value does not serialise to a JSON object")]
  NotAnObject,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
