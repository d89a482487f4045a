//! Error type for `lobby-store-json`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] lobby_core::Error),

  #[error("i/o error on {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::Io { path, source }
  }

  pub fn is_no_such_table(&self) -> bool {
    matches!(self, Self::Core(lobby_core::Error::NoSuchTable(_)))
  }

  pub fn is_duplicate_id(&self) -> bool {
    matches!(self, Self::Core(lobby_core::Error::DuplicateId { .. }))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
