//! [`BotDatabase`], the service handle shared by every bot operation.

use std::sync::Arc;

use lobby_core::store::DocumentStore;
use tracing::debug;

use crate::{Error, Result, tables};

/// Bot-level operations over a shared [`DocumentStore`].
///
/// Cloning is cheap; clones share the same store.
pub struct BotDatabase<S> {
  pub(crate) store: Arc<S>,
}

impl<S> Clone for BotDatabase<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: DocumentStore> BotDatabase<S> {
  /// Wrap `store`, creating any of the bot's tables that do not exist yet.
  pub async fn new(store: Arc<S>) -> Result<Self> {
    for table in tables::ALL {
      if store.create_table(table).await.map_err(Error::store)? {
        debug!(table, "bot table created");
      }
    }
    Ok(Self { store })
  }

  /// The underlying store, for operations the service does not wrap.
  pub fn store(&self) -> &Arc<S> { &self.store }
}
