//! Names of the tables the bot keeps.

/// User profiles and lifetime counters, keyed by user ID.
pub const USERS: &str = "users";
/// Per-room counters, keyed by room ID.
pub const ROOM_STATS: &str = "room_stats";
/// One immutable entry per executed command.
pub const COMMAND_USAGE: &str = "command_usage";
pub const USER_SESSIONS: &str = "user_sessions";
/// Key/value settings, keyed by setting name.
pub const BOT_CONFIG: &str = "bot_config";
/// Warnings; soft-deleted through their `active` flag.
pub const MODERATION: &str = "moderation";

pub const ALL: [&str; 6] =
  [USERS, ROOM_STATS, COMMAND_USAGE, USER_SESSIONS, BOT_CONFIG, MODERATION];
