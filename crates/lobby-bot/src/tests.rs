use std::sync::Arc;

use chrono::{Duration, Utc};
use lobby_core::{Fields, record::encode_dt, store::DocumentStore};
use lobby_store_json::JsonStore;
use serde_json::json;
use tempfile::TempDir;

use crate::{
  BotDatabase, Error,
  models::SYSTEM_MODERATOR,
  tables::{self, COMMAND_USAGE, MODERATION, ROOM_STATS, USER_SESSIONS, USERS},
};

async fn db() -> (TempDir, BotDatabase<JsonStore>) {
  let dir = TempDir::new().expect("temp dir");
  let store = JsonStore::open(dir.path()).await.expect("open store");
  let db = BotDatabase::new(Arc::new(store)).await.expect("init bot db");
  (dir, db)
}

fn days_ago(days: i64) -> String { encode_dt(Utc::now() - Duration::days(days)) }

// ─── Initialisation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn new_creates_every_table_once() {
  let (dir, db) = db().await;
  let names = db.store().list_tables().await.unwrap();
  for table in tables::ALL {
    assert!(names.contains(table), "{table} missing");
    assert!(dir.path().join(format!("{table}.json")).exists());
  }

  db.register_user("u1", "ann", Fields::new()).await.unwrap();

  // Reinitialising over existing data keeps it.
  let store = JsonStore::open(dir.path()).await.unwrap();
  let again = BotDatabase::new(Arc::new(store)).await.unwrap();
  assert!(again.get_user_profile("u1").await.unwrap().is_some());
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_creates_a_fresh_profile() {
  let (_dir, db) = db().await;
  let id = db
    .register_user("u1", "ann", patch! { "vip": true })
    .await
    .unwrap();
  assert_eq!(id, "u1");

  let profile = db.get_user_profile("u1").await.unwrap().unwrap();
  assert_eq!(profile.id(), "u1");
  let user = profile.value;
  assert_eq!(user.user_id, "u1");
  assert_eq!(user.username, "ann");
  assert_eq!(user.total_messages, 0);
  assert_eq!(user.total_joins, 1);
  assert_eq!(user.total_time_spent, 0);
  assert_eq!(user.user_level, 1);
  assert_eq!(user.experience_points, 0);
  assert!(user.favorite_commands.is_empty());
  assert_eq!(user.first_seen, user.last_seen);
  assert_eq!(user.extra.get("vip"), Some(&json!(true)));
}

#[tokio::test]
async fn register_existing_user_refreshes_without_resetting() {
  let (_dir, db) = db().await;
  db.register_user("u1", "ann", Fields::new()).await.unwrap();
  db.update_user_activity("u1", 3).await.unwrap();

  db.register_user("u1", "annie", patch! { "lang": "en" })
    .await
    .unwrap();

  let user = db.get_user_profile("u1").await.unwrap().unwrap().value;
  assert_eq!(user.username, "annie");
  assert_eq!(user.total_messages, 3);
  assert_eq!(user.total_joins, 1);
  assert_eq!(user.extra.get("lang"), Some(&json!("en")));
  assert!(user.last_seen >= user.first_seen);
}

#[tokio::test]
async fn unknown_profile_is_none() {
  let (_dir, db) = db().await;
  assert!(db.get_user_profile("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn activity_grants_experience_and_levels() {
  let (_dir, db) = db().await;
  db.register_user("u1", "ann", Fields::new()).await.unwrap();

  assert!(db.update_user_activity("u1", 1).await.unwrap());
  let user = db.get_user_profile("u1").await.unwrap().unwrap().value;
  assert_eq!(user.total_messages, 1);
  assert_eq!(user.experience_points, 10);
  assert_eq!(user.user_level, 1);

  db.update_user_activity("u1", 24).await.unwrap();
  let user = db.get_user_profile("u1").await.unwrap().unwrap().value;
  assert_eq!(user.total_messages, 25);
  assert_eq!(user.experience_points, 250);
  assert_eq!(user.user_level, 2);

  db.update_user_activity("u1", 5).await.unwrap();
  let user = db.get_user_profile("u1").await.unwrap().unwrap().value;
  assert_eq!(user.experience_points, 300);
  assert_eq!(user.user_level, 3);
}

#[tokio::test]
async fn activity_for_unknown_user_is_a_noop() {
  let (_dir, db) = db().await;
  assert!(!db.update_user_activity("ghost", 1).await.unwrap());
  assert!(!db.increment_user_joins("ghost").await.unwrap());
  assert_eq!(db.store().count(USERS).await.unwrap(), 0);
}

#[tokio::test]
async fn joins_are_counted() {
  let (_dir, db) = db().await;
  db.register_user("u1", "ann", Fields::new()).await.unwrap();
  assert!(db.increment_user_joins("u1").await.unwrap());
  assert!(db.increment_user_joins("u1").await.unwrap());

  let user = db.get_user_profile("u1").await.unwrap().unwrap().value;
  assert_eq!(user.total_joins, 3);
}

#[tokio::test]
async fn extreme_activity_saturates() {
  let (_dir, db) = db().await;
  db.register_user("u1", "ann", Fields::new()).await.unwrap();

  assert!(db.update_user_activity("u1", i64::MAX).await.unwrap());
  assert!(db.update_user_activity("u1", i64::MAX).await.unwrap());

  let user = db.get_user_profile("u1").await.unwrap().unwrap().value;
  assert_eq!(user.total_messages, i64::MAX);
  assert_eq!(user.experience_points, i64::MAX);
  assert_eq!(user.user_level, i64::MAX / 100);
}

#[tokio::test]
async fn register_rejects_extra_fields_that_break_the_profile() {
  let (_dir, db) = db().await;
  let err = db
    .register_user("u1", "ann", patch! { "user_level": "vip" })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Invalid { table: USERS, .. }), "{err:?}");
  assert!(db.get_user_profile("u1").await.unwrap().is_none());

  db.register_user("u1", "ann", Fields::new()).await.unwrap();
  let err = db
    .register_user("u1", "annie", patch! { "total_joins": [1, 2] })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Invalid { .. }));

  // Nothing was written; the profile still reads back.
  let user = db.get_user_profile("u1").await.unwrap().unwrap().value;
  assert_eq!(user.username, "ann");
  assert_eq!(user.total_joins, 1);
}

#[tokio::test]
async fn top_users_sort_descending_with_missing_as_zero() {
  let (_dir, db) = db().await;
  for (id, messages) in [("a", 2), ("b", 7), ("c", 0), ("d", 7)] {
    db.register_user(id, id, Fields::new()).await.unwrap();
    db.update_user_activity(id, messages).await.unwrap();
  }
  db.store()
    .update(USERS, "c", patch! { "experience_points": null }, true)
    .await
    .unwrap();

  let top = db.get_top_users(3, "experience_points").await.unwrap();
  let ids: Vec<_> = top.iter().map(|u| u.id().unwrap()).collect();
  assert_eq!(ids, ["b", "d", "a"]);

  let all = db.get_top_users(10, "no_such_field").await.unwrap();
  let ids: Vec<_> = all.iter().map(|u| u.id().unwrap()).collect();
  assert_eq!(ids, ["a", "b", "c", "d"]);
}

// ─── Command usage ───────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_commands_become_favorites() {
  let (_dir, db) = db().await;
  db.register_user("u1", "ann", Fields::new()).await.unwrap();

  for command in ["a", "b", "c", "d", "e", "f", "c"] {
    db.log_command_usage("u1", command, true).await.unwrap();
  }
  db.log_command_usage("u1", "failed", false).await.unwrap();

  let user = db.get_user_profile("u1").await.unwrap().unwrap().value;
  assert_eq!(user.favorite_commands, ["c", "f", "e", "d", "b"]);
  assert_eq!(db.store().count(COMMAND_USAGE).await.unwrap(), 8);
}

#[tokio::test]
async fn repeated_commands_get_distinct_ids() {
  let (_dir, db) = db().await;
  let mut ids = Vec::new();
  for _ in 0..20 {
    ids.push(db.log_command_usage("u1", "ping", true).await.unwrap());
  }
  ids.sort();
  ids.dedup();
  assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn logging_for_unregistered_user_only_records_usage() {
  let (_dir, db) = db().await;
  db.log_command_usage("ghost", "ping", true).await.unwrap();
  assert_eq!(db.store().count(COMMAND_USAGE).await.unwrap(), 1);
  assert_eq!(db.store().count(USERS).await.unwrap(), 0);
}

#[tokio::test]
async fn command_stats_cover_recent_entries_only() {
  let (_dir, db) = db().await;
  db.log_command_usage("u1", "ping", true).await.unwrap();
  db.log_command_usage("u1", "ping", false).await.unwrap();
  db.log_command_usage("u2", "joke", true).await.unwrap();

  let store = db.store();
  store
    .create(
      COMMAND_USAGE,
      patch! {
        "user_id": "u3", "command": "old", "timestamp": days_ago(30), "success": true,
      },
      None,
    )
    .await
    .unwrap();
  store
    .create(
      COMMAND_USAGE,
      patch! { "user_id": "u3", "command": "bad", "timestamp": "yesterday" },
      None,
    )
    .await
    .unwrap();

  let stats = db.get_command_stats(7).await.unwrap();
  assert_eq!(stats.total_commands, 3);
  assert_eq!(stats.successful_commands, 2);
  assert_eq!(stats.command_breakdown.get("ping"), Some(&2));
  assert_eq!(stats.command_breakdown.get("joke"), Some(&1));
  assert!(!stats.command_breakdown.contains_key("old"));
  assert_eq!(stats.top_users.get("u1"), Some(&2));
  assert_eq!(stats.top_users.get("u2"), Some(&1));
  assert!(!stats.top_users.contains_key("u3"));

  let wide = db.get_command_stats(60).await.unwrap();
  assert_eq!(wide.total_commands, 4);
}

#[tokio::test]
async fn huge_windows_reach_back_to_the_beginning() {
  let (_dir, db) = db().await;
  db.log_command_usage("u1", "ping", true).await.unwrap();
  db.store()
    .create(
      COMMAND_USAGE,
      patch! { "user_id": "u2", "command": "old", "timestamp": days_ago(4000) },
      None,
    )
    .await
    .unwrap();
  db.store()
    .create(
      USER_SESSIONS,
      patch! {
        "user_id": "u1", "start_time": days_ago(4001), "end_time": days_ago(4000),
      },
      None,
    )
    .await
    .unwrap();

  let stats = db.get_command_stats(u32::MAX).await.unwrap();
  assert_eq!(stats.total_commands, 2);

  assert_eq!(db.cleanup_old_data(u32::MAX).await.unwrap(), 0);
  assert_eq!(db.store().count(COMMAND_USAGE).await.unwrap(), 2);
  assert_eq!(db.store().count(USER_SESSIONS).await.unwrap(), 1);
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_lifecycle() {
  let (_dir, db) = db().await;
  db.register_user("u1", "ann", Fields::new()).await.unwrap();

  let id = db
    .start_user_session("u1", patch! { "room": "lobby" })
    .await
    .unwrap();
  assert!(db.update_session_activity("u1", 3, 1).await.unwrap());
  assert!(db.update_session_activity("u1", 2, 0).await.unwrap());

  // Pretend the session began 90 minutes ago.
  let started = encode_dt(Utc::now() - Duration::minutes(90));
  db.store()
    .update(USER_SESSIONS, &id, patch! { "start_time": started }, true)
    .await
    .unwrap();

  assert_eq!(db.end_user_session("u1").await.unwrap(), Some(90));

  let session = db.store().read(USER_SESSIONS, &id).await.unwrap().unwrap();
  let session = session.decode::<crate::models::UserSession>().unwrap().value;
  assert!(!session.is_active());
  assert_eq!(session.duration_minutes, 90);
  assert_eq!(session.messages_sent, 5);
  assert_eq!(session.commands_used, 1);
  assert_eq!(session.metadata.get("room"), Some(&json!("lobby")));

  let user = db.get_user_profile("u1").await.unwrap().unwrap().value;
  assert_eq!(user.total_time_spent, 90);
}

#[tokio::test]
async fn no_active_session_means_nothing_to_end() {
  let (_dir, db) = db().await;
  assert_eq!(db.end_user_session("u1").await.unwrap(), None);
  assert!(!db.update_session_activity("u1", 1, 1).await.unwrap());

  db.start_user_session("u1", Fields::new()).await.unwrap();
  assert_eq!(db.end_user_session("u1").await.unwrap(), Some(0));
  assert_eq!(db.end_user_session("u1").await.unwrap(), None);
}

#[tokio::test]
async fn oldest_active_session_is_ended_first() {
  let (_dir, db) = db().await;
  let first = db.start_user_session("u1", Fields::new()).await.unwrap();
  let second = db.start_user_session("u1", Fields::new()).await.unwrap();
  db.start_user_session("u2", Fields::new()).await.unwrap();

  db.end_user_session("u1").await.unwrap();

  let store = db.store();
  let first = store.read(USER_SESSIONS, &first).await.unwrap().unwrap();
  let second = store.read(USER_SESSIONS, &second).await.unwrap().unwrap();
  assert!(!first.is_unset("end_time"));
  assert!(second.is_unset("end_time"));
}

// ─── Rooms ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn room_stats_upsert() {
  let (_dir, db) = db().await;
  assert!(
    db.update_room_stats("r1", patch! { "peak_users": 4, "theme": "dark" })
      .await
      .unwrap()
  );

  let room = db.get_room_stats("r1").await.unwrap().unwrap().value;
  assert_eq!(room.room_id, "r1");
  assert_eq!(room.total_users, 0);
  assert_eq!(room.total_messages, 0);
  assert_eq!(room.peak_users, 4);
  assert_eq!(room.extra.get("theme"), Some(&json!("dark")));

  assert!(
    !db.update_room_stats("r1", patch! { "total_messages": 12 })
      .await
      .unwrap()
  );
  let updated = db.get_room_stats("r1").await.unwrap().unwrap().value;
  assert_eq!(updated.total_messages, 12);
  assert_eq!(updated.peak_users, 4);
  assert_eq!(updated.first_tracked, room.first_tracked);

  assert!(db.get_room_stats("r2").await.unwrap().is_none());
}

#[tokio::test]
async fn room_stats_reject_fields_that_break_the_model() {
  let (_dir, db) = db().await;
  let err = db
    .update_room_stats("r1", patch! { "peak_users": "many" })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Invalid { table: ROOM_STATS, .. }));
  assert!(db.get_room_stats("r1").await.unwrap().is_none());

  db.update_room_stats("r1", patch! { "peak_users": 3 }).await.unwrap();
  let err = db
    .update_room_stats("r1", patch! { "first_tracked": 12 })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Invalid { .. }));
  let room = db.get_room_stats("r1").await.unwrap().unwrap().value;
  assert_eq!(room.peak_users, 3);
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn config_round_trips_and_overwrites() {
  let (_dir, db) = db().await;
  assert_eq!(db.get_config("greeting").await.unwrap(), None);
  assert_eq!(
    db.get_config_or("greeting", json!("hi")).await.unwrap(),
    json!("hi")
  );

  db.set_config("greeting", json!("hello")).await.unwrap();
  db.set_config("limits", json!({ "max": 3 })).await.unwrap();
  db.set_config("greeting", json!("welcome")).await.unwrap();

  assert_eq!(
    db.get_config("greeting").await.unwrap(),
    Some(json!("welcome"))
  );
  assert_eq!(
    db.get_config("limits").await.unwrap(),
    Some(json!({ "max": 3 }))
  );
  assert_eq!(db.store().count(tables::BOT_CONFIG).await.unwrap(), 2);
}

// ─── Moderation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn warnings_are_listed_newest_first_and_soft_cleared() {
  let (_dir, db) = db().await;
  db.store()
    .create(
      MODERATION,
      patch! {
        "user_id": "u1", "reason": "old", "moderator": "mod",
        "timestamp": days_ago(2), "active": true,
      },
      None,
    )
    .await
    .unwrap();
  db.add_warning("u1", "spam", None).await.unwrap();
  db.add_warning("u2", "caps", Some("mod")).await.unwrap();

  let warnings = db.get_user_warnings("u1", true).await.unwrap();
  let reasons: Vec<_> =
    warnings.iter().map(|w| w.get_str("reason").unwrap()).collect();
  assert_eq!(reasons, ["spam", "old"]);
  assert_eq!(warnings[0].get_str("moderator"), Some(SYSTEM_MODERATOR));

  assert_eq!(db.clear_user_warnings("u1").await.unwrap(), 2);
  assert!(db.get_user_warnings("u1", true).await.unwrap().is_empty());
  assert_eq!(db.clear_user_warnings("u1").await.unwrap(), 0);

  let all = db.get_user_warnings("u1", false).await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(all.iter().all(|w| w.get_bool("active") == Some(false)));

  assert_eq!(db.get_user_warnings("u2", true).await.unwrap().len(), 1);
  assert_eq!(db.store().count(MODERATION).await.unwrap(), 3);
}

// ─── Reporting ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn summary_counts_everything() {
  let (_dir, db) = db().await;
  for (id, messages) in
    [("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5), ("f", 6)]
  {
    db.register_user(id, &format!("user-{id}"), Fields::new())
      .await
      .unwrap();
    db.update_user_activity(id, messages).await.unwrap();
  }
  db.start_user_session("a", Fields::new()).await.unwrap();
  db.log_command_usage("a", "ping", true).await.unwrap();
  db.update_room_stats("r1", Fields::new()).await.unwrap();
  db.add_warning("a", "spam", None).await.unwrap();
  db.add_warning("b", "spam", None).await.unwrap();
  db.clear_user_warnings("b").await.unwrap();

  let summary = db.get_database_summary().await.unwrap();
  assert_eq!(summary.user_count, 6);
  assert_eq!(summary.total_sessions, 1);
  assert_eq!(summary.total_commands, 1);
  assert_eq!(summary.room_count, 1);
  assert_eq!(summary.total_warnings, 1);
  assert_eq!(summary.database_stats.table_count, tables::ALL.len());
  assert_eq!(summary.database_stats.tables[USERS].record_count, 6);

  let top: Vec<_> = summary
    .top_users_by_xp
    .iter()
    .map(|e| (e.username.as_str(), e.xp))
    .collect();
  assert_eq!(top, [
    ("user-f", 60),
    ("user-e", 50),
    ("user-d", 40),
    ("user-c", 30),
    ("user-b", 20),
  ]);
}

#[tokio::test]
async fn cleanup_removes_only_old_finished_data() {
  let (dir, db) = db().await;
  let store = db.store();

  let old_ended = store
    .create(
      USER_SESSIONS,
      patch! {
        "user_id": "u1", "start_time": days_ago(41), "end_time": days_ago(40),
      },
      None,
    )
    .await
    .unwrap();
  let old_active = store
    .create(
      USER_SESSIONS,
      patch! { "user_id": "u2", "start_time": days_ago(40), "end_time": null },
      None,
    )
    .await
    .unwrap();
  let recent_ended = store
    .create(
      USER_SESSIONS,
      patch! { "user_id": "u3", "start_time": days_ago(2), "end_time": days_ago(1) },
      None,
    )
    .await
    .unwrap();

  let old_command = store
    .create(
      COMMAND_USAGE,
      patch! { "user_id": "u1", "command": "ping", "timestamp": days_ago(31) },
      None,
    )
    .await
    .unwrap();
  let undated = store
    .create(COMMAND_USAGE, patch! { "user_id": "u1", "command": "ping" }, None)
    .await
    .unwrap();
  let garbled = store
    .create(
      COMMAND_USAGE,
      patch! { "user_id": "u1", "command": "ping", "timestamp": "not a date" },
      None,
    )
    .await
    .unwrap();
  let recent_command = db.log_command_usage("u1", "ping", true).await.unwrap();

  assert_eq!(db.cleanup_old_data(30).await.unwrap(), 3);

  // Deletions are durable.
  let reopened = JsonStore::open(dir.path()).await.unwrap();
  for (table, id, kept) in [
    (USER_SESSIONS, &old_ended, false),
    (USER_SESSIONS, &old_active, true),
    (USER_SESSIONS, &recent_ended, true),
    (COMMAND_USAGE, &old_command, false),
    (COMMAND_USAGE, &undated, false),
    (COMMAND_USAGE, &garbled, true),
    (COMMAND_USAGE, &recent_command, true),
  ] {
    let present = reopened.read(table, id).await.unwrap().is_some();
    assert_eq!(present, kept, "{table}/{id}");
  }

  assert_eq!(db.cleanup_old_data(30).await.unwrap(), 0);
}
