//! Command usage log and the analytics derived from it.

use chrono::Utc;
use lobby_core::{Record, RecordId, record::to_fields, store::DocumentStore};
use tracing::debug;

use crate::{
  BotDatabase, Error, Result,
  models::{
    CommandStats, CommandUsage, days_ago, favorite_commands, promote_favorite,
  },
  tables::{COMMAND_USAGE, USERS},
};

impl<S: DocumentStore> BotDatabase<S> {
  /// Append a usage entry and return its ID.
  ///
  /// A successful command also moves to the front of the user's favourites
  /// (if the user is registered).
  pub async fn log_command_usage(
    &self,
    user_id: &str,
    command: &str,
    success: bool,
  ) -> Result<RecordId> {
    let entry = CommandUsage {
      user_id: user_id.to_owned(),
      command: command.to_owned(),
      timestamp: Utc::now(),
      success,
    };
    let id = self
      .store
      .create(COMMAND_USAGE, to_fields(&entry)?, None)
      .await
      .map_err(Error::store)?;
    debug!(user_id, command, success, %id, "command logged");

    if !success {
      return Ok(id);
    }

    if let Some(user) =
      self.store.read(USERS, user_id).await.map_err(Error::store)?
    {
      let mut favorites = favorite_commands(&user);
      promote_favorite(&mut favorites, command);
      self
        .store
        .update(USERS, user_id, patch! { "favorite_commands": favorites }, true)
        .await
        .map_err(Error::store)?;
    }

    Ok(id)
  }

  /// Aggregate the entries logged during the last `days` days.
  ///
  /// Entries whose timestamp is missing or unreadable are not counted.
  pub async fn get_command_stats(&self, days: u32) -> Result<CommandStats> {
    let cutoff = days_ago(days);
    let recent = self
      .store
      .find(COMMAND_USAGE, move |entry: &Record| {
        entry.get_dt("timestamp").map(|at| at > cutoff)
      })
      .await
      .map_err(Error::store)?;

    let mut stats = CommandStats {
      total_commands: recent.len(),
      ..CommandStats::default()
    };
    for entry in &recent {
      if entry.get_bool("success").unwrap_or(false) {
        stats.successful_commands += 1;
      }
      let command = entry.get_str("command").unwrap_or("unknown");
      *stats.command_breakdown.entry(command.to_owned()).or_default() += 1;
      let user = entry.get_str("user_id").unwrap_or("unknown");
      *stats.top_users.entry(user.to_owned()).or_default() += 1;
    }

    Ok(stats)
  }
}
