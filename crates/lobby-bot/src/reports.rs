//! Store-wide reporting and retention.

use chrono::{DateTime, Utc};
use lobby_core::{Record, store::DocumentStore};
use tracing::{debug, info};

use crate::{
  BotDatabase, Error, Result,
  models::{DatabaseSummary, XpEntry, days_ago},
  tables::{COMMAND_USAGE, MODERATION, ROOM_STATS, USER_SESSIONS, USERS},
};

/// Number of users listed in [`DatabaseSummary::top_users_by_xp`].
const SUMMARY_TOP_USERS: usize = 5;

impl<S: DocumentStore> BotDatabase<S> {
  pub async fn get_database_summary(&self) -> Result<DatabaseSummary> {
    let store = &self.store;
    let database_stats = store.stats().await.map_err(Error::store)?;
    let user_count = store.count(USERS).await.map_err(Error::store)?;
    let total_sessions = store.count(USER_SESSIONS).await.map_err(Error::store)?;
    let total_commands = store.count(COMMAND_USAGE).await.map_err(Error::store)?;
    let room_count = store.count(ROOM_STATS).await.map_err(Error::store)?;
    let total_warnings = store
      .find(MODERATION, |w: &Record| w.get_bool("active").unwrap_or(true))
      .await
      .map_err(Error::store)?
      .len();

    let top_users_by_xp = self
      .get_top_users(SUMMARY_TOP_USERS, "experience_points")
      .await?
      .into_iter()
      .map(|user| XpEntry {
        username: user.get_str("username").unwrap_or_default().to_owned(),
        xp:       user.get_i64("experience_points").unwrap_or(0),
      })
      .collect();

    Ok(DatabaseSummary {
      database_stats,
      user_count,
      total_sessions,
      total_commands,
      room_count,
      total_warnings,
      top_users_by_xp,
    })
  }

  /// Delete ended sessions and command usage entries older than `days`
  /// days. Returns the number of records removed.
  ///
  /// Active sessions are never removed. A usage entry without a timestamp
  /// is dated to the Unix epoch; one whose timestamp cannot be read is
  /// kept.
  pub async fn cleanup_old_data(&self, days: u32) -> Result<usize> {
    let cutoff = days_ago(days);

    let old_sessions = self
      .store
      .find(USER_SESSIONS, move |s: &Record| {
        s.get_dt("end_time").map(|ended| ended < cutoff)
      })
      .await
      .map_err(Error::store)?;

    let old_commands = self
      .store
      .find(COMMAND_USAGE, move |c: &Record| {
        let logged = if c.is_unset("timestamp") {
          Some(DateTime::<Utc>::UNIX_EPOCH)
        } else {
          c.get_dt("timestamp")
        };
        logged.map(|at| at < cutoff)
      })
      .await
      .map_err(Error::store)?;

    let mut removed = 0;
    for (table, records) in
      [(USER_SESSIONS, &old_sessions), (COMMAND_USAGE, &old_commands)]
    {
      for record in records {
        let Some(id) = record.id() else { continue };
        if self.store.delete(table, id).await.map_err(Error::store)? {
          removed += 1;
        }
      }
      debug!(table, candidates = records.len(), "retention pass done");
    }

    info!(days, removed, "old data cleaned up");
    Ok(removed)
  }
}
