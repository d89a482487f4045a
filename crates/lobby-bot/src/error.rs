//! Error type for `lobby-bot`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The backing store failed; the concrete type depends on the backend.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("record error: {0}")]
  Record(#[from] lobby_core::Error),

  /// A write would leave a record its model can no longer read.
  #[error("invalid {table} record: {source}")]
  Invalid {
    table:  &'static str,
    #[source]
    source: serde_json::Error,
  },
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
