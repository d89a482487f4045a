//! Typed shapes of the records kept in each bot table.
//!
//! Records are open, so models that describe long-lived entities keep any
//! field they do not know about in `extra`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use lobby_core::{Fields, Record, store::StoreStats};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Error, Result};

// ─── Levelling ───────────────────────────────────────────────────────────────

pub const XP_PER_MESSAGE: i64 = 10;
pub const XP_PER_LEVEL: i64 = 100;

/// How many recently used commands a profile remembers.
pub const FAVORITE_COMMANDS_LIMIT: usize = 5;

/// A user's level is derived from experience alone: one level per
/// [`XP_PER_LEVEL`] points, never below 1.
pub fn level_for(experience: i64) -> i64 { (experience / XP_PER_LEVEL).max(1) }

/// Move `command` to the front of `favorites`, dropping earlier occurrences
/// and anything past [`FAVORITE_COMMANDS_LIMIT`].
pub fn promote_favorite(favorites: &mut Vec<String>, command: &str) {
  favorites.retain(|c| c != command);
  favorites.insert(0, command.to_owned());
  favorites.truncate(FAVORITE_COMMANDS_LIMIT);
}

/// The instant `days` days ago, saturating at the earliest representable
/// time.
pub fn days_ago(days: u32) -> DateTime<Utc> {
  Duration::try_days(days.into())
    .and_then(|window| Utc::now().checked_sub_signed(window))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Check that `fields` still decodes as a `T` before it is written to
/// `table`.
pub(crate) fn ensure_decodes<T: DeserializeOwned>(
  table: &'static str,
  fields: &Fields,
) -> Result<()> {
  serde_json::from_value::<T>(Value::Object(fields.clone()))
    .map(drop)
    .map_err(|source| Error::Invalid { table, source })
}

/// The `favorite_commands` list of a user record; non-string entries are
/// skipped.
pub(crate) fn favorite_commands(user: &Record) -> Vec<String> {
  user
    .get("favorite_commands")
    .and_then(Value::as_array)
    .map(|list| {
      list
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect()
    })
    .unwrap_or_default()
}

// ─── users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:           String,
  pub username:          String,
  pub first_seen:        DateTime<Utc>,
  pub last_seen:         DateTime<Utc>,
  #[serde(default)]
  pub total_messages:    i64,
  #[serde(default)]
  pub total_joins:       i64,
  /// Minutes spent across all ended sessions.
  #[serde(default)]
  pub total_time_spent:  i64,
  /// Most recent first.
  #[serde(default)]
  pub favorite_commands: Vec<String>,
  #[serde(default = "first_level")]
  pub user_level:        i64,
  #[serde(default)]
  pub experience_points: i64,
  #[serde(flatten)]
  pub extra:             Fields,
}

fn first_level() -> i64 { 1 }

impl UserProfile {
  /// A brand-new profile: one join, no activity, level 1.
  pub fn new(user_id: &str, username: &str, now: DateTime<Utc>) -> Self {
    Self {
      user_id:           user_id.to_owned(),
      username:          username.to_owned(),
      first_seen:        now,
      last_seen:         now,
      total_messages:    0,
      total_joins:       1,
      total_time_spent:  0,
      favorite_commands: Vec::new(),
      user_level:        1,
      experience_points: 0,
      extra:             Fields::new(),
    }
  }
}

// ─── command_usage ───────────────────────────────────────────────────────────

/// One executed command. Never modified after it is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandUsage {
  pub user_id:   String,
  pub command:   String,
  pub timestamp: DateTime<Utc>,
  pub success:   bool,
}

/// Aggregates over recent [`CommandUsage`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStats {
  pub total_commands:      usize,
  pub successful_commands: usize,
  /// Uses per command name.
  pub command_breakdown:   BTreeMap<String, usize>,
  /// Uses per user ID.
  pub top_users:           BTreeMap<String, usize>,
}

// ─── user_sessions ───────────────────────────────────────────────────────────

/// A presence session; active while `end_time` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
  pub user_id:          String,
  pub start_time:       DateTime<Utc>,
  #[serde(default)]
  pub end_time:         Option<DateTime<Utc>>,
  #[serde(default)]
  pub duration_minutes: i64,
  #[serde(default)]
  pub messages_sent:    i64,
  #[serde(default)]
  pub commands_used:    i64,
  #[serde(default)]
  pub metadata:         Fields,
}

impl UserSession {
  pub fn start(user_id: &str, metadata: Fields, now: DateTime<Utc>) -> Self {
    Self {
      user_id: user_id.to_owned(),
      start_time: now,
      end_time: None,
      duration_minutes: 0,
      messages_sent: 0,
      commands_used: 0,
      metadata,
    }
  }

  pub fn is_active(&self) -> bool { self.end_time.is_none() }
}

// ─── room_stats ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomStats {
  pub room_id:        String,
  pub first_tracked:  DateTime<Utc>,
  #[serde(default)]
  pub total_users:    i64,
  #[serde(default)]
  pub total_messages: i64,
  #[serde(default)]
  pub peak_users:     i64,
  #[serde(flatten)]
  pub extra:          Fields,
}

impl RoomStats {
  pub fn new(room_id: &str, now: DateTime<Utc>) -> Self {
    Self {
      room_id:        room_id.to_owned(),
      first_tracked:  now,
      total_users:    0,
      total_messages: 0,
      peak_users:     0,
      extra:          Fields::new(),
    }
  }
}

// ─── bot_config ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
  pub key:        String,
  pub value:      Value,
  pub updated_at: DateTime<Utc>,
}

// ─── moderation ──────────────────────────────────────────────────────────────

/// Moderator name recorded for automatic warnings.
pub const SYSTEM_MODERATOR: &str = "system";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
  pub user_id:   String,
  pub reason:    String,
  pub moderator: String,
  pub timestamp: DateTime<Utc>,
  /// Cleared warnings stay on record with `active == false`.
  #[serde(default = "active_by_default")]
  pub active:    bool,
}

fn active_by_default() -> bool { true }

// ─── Reporting ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpEntry {
  pub username: String,
  pub xp:       i64,
}

/// A one-shot overview of everything the bot stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSummary {
  pub database_stats:  StoreStats,
  pub user_count:      usize,
  pub total_sessions:  usize,
  pub total_commands:  usize,
  pub room_count:      usize,
  /// Active warnings only.
  pub total_warnings:  usize,
  pub top_users_by_xp: Vec<XpEntry>,
}
