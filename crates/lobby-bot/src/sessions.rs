//! Presence sessions.
//!
//! A user is expected to have at most one active session; nothing enforces
//! it. When several are active, the oldest one (first in table order) is the
//! one ended or updated.

use chrono::Utc;
use lobby_core::{
  Fields, Record, RecordId,
  record::{encode_dt, to_fields},
  store::DocumentStore,
};
use tracing::{debug, warn};

use crate::{
  BotDatabase, Error, Result,
  models::UserSession,
  tables::{USER_SESSIONS, USERS},
};

fn active_session_of(user_id: &str) -> impl Fn(&Record) -> bool + Send + '_ {
  move |session: &Record| {
    session.get_str("user_id") == Some(user_id) && session.is_unset("end_time")
  }
}

impl<S: DocumentStore> BotDatabase<S> {
  async fn active_session(&self, user_id: &str) -> Result<Option<Record>> {
    self
      .store
      .find_one(USER_SESSIONS, active_session_of(user_id))
      .await
      .map_err(Error::store)
  }

  /// Open a new session for `user_id` and return its ID.
  pub async fn start_user_session(
    &self,
    user_id: &str,
    metadata: Fields,
  ) -> Result<RecordId> {
    let session = UserSession::start(user_id, metadata, Utc::now());
    let id = self
      .store
      .create(USER_SESSIONS, to_fields(&session)?, None)
      .await
      .map_err(Error::store)?;
    debug!(user_id, %id, "session started");
    Ok(id)
  }

  /// Close the user's active session.
  ///
  /// Returns the session length in whole minutes, which is also added to the
  /// user's `total_time_spent`, or `None` if no session was active.
  pub async fn end_user_session(&self, user_id: &str) -> Result<Option<i64>> {
    let Some(session) = self.active_session(user_id).await? else {
      return Ok(None);
    };
    let Some(session_id) = session.id() else {
      return Ok(None);
    };

    let now = Utc::now();
    let duration = match session.get_dt("start_time") {
      Some(start) => (now - start).num_minutes().max(0),
      None => {
        warn!(user_id, session_id, "session has no valid start time");
        0
      }
    };

    let data = patch! {
      "end_time": encode_dt(now),
      "duration_minutes": duration,
    };
    self
      .store
      .update(USER_SESSIONS, session_id, data, true)
      .await
      .map_err(Error::store)?;

    if let Some(user) =
      self.store.read(USERS, user_id).await.map_err(Error::store)?
    {
      let total = user
        .get_i64("total_time_spent")
        .unwrap_or(0)
        .saturating_add(duration);
      self
        .store
        .update(USERS, user_id, patch! { "total_time_spent": total }, true)
        .await
        .map_err(Error::store)?;
    }

    debug!(user_id, session_id, duration, "session ended");
    Ok(Some(duration))
  }

  /// Add to the active session's counters. Returns `false` if no session
  /// was active.
  pub async fn update_session_activity(
    &self,
    user_id: &str,
    messages: i64,
    commands: i64,
  ) -> Result<bool> {
    let Some(session) = self.active_session(user_id).await? else {
      return Ok(false);
    };
    let Some(session_id) = session.id() else {
      return Ok(false);
    };

    let data = patch! {
      "messages_sent":
        session.get_i64("messages_sent").unwrap_or(0).saturating_add(messages),
      "commands_used":
        session.get_i64("commands_used").unwrap_or(0).saturating_add(commands),
    };
    self
      .store
      .update(USER_SESSIONS, session_id, data, true)
      .await
      .map_err(Error::store)
  }
}
