//! Runtime bot configuration, one record per key.

use chrono::Utc;
use lobby_core::{record::to_fields, store::DocumentStore};
use serde_json::Value;

use crate::{
  BotDatabase, Error, Result, models::ConfigEntry, tables::BOT_CONFIG,
};

impl<S: DocumentStore> BotDatabase<S> {
  pub async fn set_config(&self, key: &str, value: Value) -> Result<()> {
    let entry = ConfigEntry {
      key: key.to_owned(),
      value,
      updated_at: Utc::now(),
    };
    let data = to_fields(&entry)?;

    let updated = self
      .store
      .update(BOT_CONFIG, key, data.clone(), true)
      .await
      .map_err(Error::store)?;
    if !updated {
      self
        .store
        .create(BOT_CONFIG, data, Some(key.to_owned()))
        .await
        .map_err(Error::store)?;
    }
    Ok(())
  }

  /// The stored value for `key`, if any.
  pub async fn get_config(&self, key: &str) -> Result<Option<Value>> {
    let entry = self.store.read(BOT_CONFIG, key).await.map_err(Error::store)?;
    Ok(entry.and_then(|e| e.get("value").cloned()))
  }

  pub async fn get_config_or(&self, key: &str, default: Value) -> Result<Value> {
    Ok(self.get_config(key).await?.unwrap_or(default))
  }
}
