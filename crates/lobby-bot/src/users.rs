//! User profiles, activity counters and levelling.

use std::cmp::Ordering;

use chrono::Utc;
use lobby_core::{
  Fields, Record, RecordId, Stored,
  record::{encode_dt, to_fields},
  store::DocumentStore,
};
use tracing::debug;

use crate::{
  BotDatabase, Error, Result,
  models::{UserProfile, XP_PER_MESSAGE, ensure_decodes, level_for},
  tables::USERS,
};

impl<S: DocumentStore> BotDatabase<S> {
  /// Create a profile for `user_id`, or refresh the existing one.
  ///
  /// Known users get their `username`, `last_seen` and `extra` fields merged
  /// in; counters are left alone. New users start with one join, no activity
  /// and level 1. In both cases `extra` wins over the built-in fields, but
  /// a profile it would make unreadable (e.g. a non-numeric `user_level`) is
  /// rejected with [`Error::Invalid`] and nothing is written.
  pub async fn register_user(
    &self,
    user_id: &str,
    username: &str,
    extra: Fields,
  ) -> Result<RecordId> {
    let now = Utc::now();
    let existing = self.store.read(USERS, user_id).await.map_err(Error::store)?;

    if let Some(user) = existing {
      let mut data = patch! {
        "username": username,
        "last_seen": encode_dt(now),
      };
      data.extend(extra);

      let mut merged = user.content();
      merged.extend(data.clone());
      ensure_decodes::<UserProfile>(USERS, &merged)?;

      self
        .store
        .update(USERS, user_id, data, true)
        .await
        .map_err(Error::store)?;
      debug!(user_id, "user refreshed");
      return Ok(user_id.to_owned());
    }

    let mut data = to_fields(&UserProfile::new(user_id, username, now))?;
    data.extend(extra);
    ensure_decodes::<UserProfile>(USERS, &data)?;
    let id = self
      .store
      .create(USERS, data, Some(user_id.to_owned()))
      .await
      .map_err(Error::store)?;
    debug!(user_id, "user registered");
    Ok(id)
  }

  pub async fn get_user_profile(
    &self,
    user_id: &str,
  ) -> Result<Option<Stored<UserProfile>>> {
    let record = self.store.read(USERS, user_id).await.map_err(Error::store)?;
    Ok(record.map(|r| r.decode()).transpose()?)
  }

  /// Count `messages` new messages for the user and grant
  /// [`XP_PER_MESSAGE`] experience for each. The level is recomputed from
  /// the new experience total. Returns `false` for unknown users.
  pub async fn update_user_activity(
    &self,
    user_id: &str,
    messages: i64,
  ) -> Result<bool> {
    let Some(user) = self.store.read(USERS, user_id).await.map_err(Error::store)?
    else {
      return Ok(false);
    };

    let total_messages = user
      .get_i64("total_messages")
      .unwrap_or(0)
      .saturating_add(messages);
    let experience = user
      .get_i64("experience_points")
      .unwrap_or(0)
      .saturating_add(messages.saturating_mul(XP_PER_MESSAGE));

    let data = patch! {
      "total_messages": total_messages,
      "experience_points": experience,
      "user_level": level_for(experience),
      "last_seen": encode_dt(Utc::now()),
    };
    self
      .store
      .update(USERS, user_id, data, true)
      .await
      .map_err(Error::store)
  }

  /// Returns `false` for unknown users.
  pub async fn increment_user_joins(&self, user_id: &str) -> Result<bool> {
    let Some(user) = self.store.read(USERS, user_id).await.map_err(Error::store)?
    else {
      return Ok(false);
    };

    let data = patch! {
      "total_joins": user.get_i64("total_joins").unwrap_or(0).saturating_add(1),
      "last_seen": encode_dt(Utc::now()),
    };
    self
      .store
      .update(USERS, user_id, data, true)
      .await
      .map_err(Error::store)
  }

  /// Up to `limit` user records, highest `sort_by` first.
  ///
  /// A missing or non-numeric `sort_by` counts as 0. Ties keep table order.
  pub async fn get_top_users(
    &self,
    limit: usize,
    sort_by: &str,
  ) -> Result<Vec<Record>> {
    let mut users: Vec<Record> = self
      .store
      .read_all(USERS)
      .await
      .map_err(Error::store)?
      .into_values()
      .collect();

    let key = |user: &Record| user.get_f64(sort_by).unwrap_or(0.0);
    users.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
    users.truncate(limit);
    Ok(users)
  }
}
