//! Warnings issued to users. Cleared warnings are kept, marked inactive.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use lobby_core::{Record, RecordId, record::to_fields, store::DocumentStore};
use tracing::{debug, info};

use crate::{
  BotDatabase, Error, Result,
  models::{SYSTEM_MODERATOR, Warning},
  tables::MODERATION,
};

/// Warnings without the flag count as active.
fn is_active(warning: &Record) -> bool {
  warning.get_bool("active").unwrap_or(true)
}

impl<S: DocumentStore> BotDatabase<S> {
  /// Record a warning and return its ID. `moderator` defaults to
  /// [`SYSTEM_MODERATOR`].
  pub async fn add_warning(
    &self,
    user_id: &str,
    reason: &str,
    moderator: Option<&str>,
  ) -> Result<RecordId> {
    let warning = Warning {
      user_id:   user_id.to_owned(),
      reason:    reason.to_owned(),
      moderator: moderator.unwrap_or(SYSTEM_MODERATOR).to_owned(),
      timestamp: Utc::now(),
      active:    true,
    };
    let id = self
      .store
      .create(MODERATION, to_fields(&warning)?, None)
      .await
      .map_err(Error::store)?;
    debug!(user_id, %id, "warning added");
    Ok(id)
  }

  /// The user's warnings, newest first.
  pub async fn get_user_warnings(
    &self,
    user_id: &str,
    active_only: bool,
  ) -> Result<Vec<Record>> {
    let mut warnings = self
      .store
      .find(MODERATION, move |w: &Record| {
        w.get_str("user_id") == Some(user_id) && (!active_only || is_active(w))
      })
      .await
      .map_err(Error::store)?;

    let issued =
      |w: &Record| w.get_dt("timestamp").unwrap_or(DateTime::<Utc>::MIN_UTC);
    warnings.sort_by_key(|w| Reverse(issued(w)));
    Ok(warnings)
  }

  /// Deactivate every active warning of the user. Returns how many were
  /// cleared.
  pub async fn clear_user_warnings(&self, user_id: &str) -> Result<usize> {
    let warnings = self.get_user_warnings(user_id, true).await?;

    let mut cleared = 0;
    for warning in &warnings {
      let Some(id) = warning.id() else { continue };
      if self
        .store
        .update(MODERATION, id, patch! { "active": false }, true)
        .await
        .map_err(Error::store)?
      {
        cleared += 1;
      }
    }

    info!(user_id, cleared, "warnings cleared");
    Ok(cleared)
  }
}
