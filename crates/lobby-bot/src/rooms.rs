//! Per-room statistics.

use chrono::Utc;
use lobby_core::{Fields, Stored, record::to_fields, store::DocumentStore};
use tracing::debug;

use crate::{
  BotDatabase, Error, Result,
  models::{RoomStats, ensure_decodes},
  tables::ROOM_STATS,
};

impl<S: DocumentStore> BotDatabase<S> {
  /// Merge `stats` into the room's record, creating it on first sight.
  ///
  /// A new room starts from zeroed counters with `stats` applied on top.
  /// Returns `true` if the room was newly tracked. Stats that would leave
  /// the record unreadable as [`RoomStats`] fail with [`Error::Invalid`].
  pub async fn update_room_stats(
    &self,
    room_id: &str,
    stats: Fields,
  ) -> Result<bool> {
    let existing =
      self.store.read(ROOM_STATS, room_id).await.map_err(Error::store)?;

    if let Some(room) = existing {
      let mut merged = room.content();
      merged.extend(stats.clone());
      ensure_decodes::<RoomStats>(ROOM_STATS, &merged)?;

      self
        .store
        .update(ROOM_STATS, room_id, stats, true)
        .await
        .map_err(Error::store)?;
      return Ok(false);
    }

    let mut data = to_fields(&RoomStats::new(room_id, Utc::now()))?;
    data.extend(stats);
    ensure_decodes::<RoomStats>(ROOM_STATS, &data)?;
    self
      .store
      .create(ROOM_STATS, data, Some(room_id.to_owned()))
      .await
      .map_err(Error::store)?;
    debug!(room_id, "room tracked");
    Ok(true)
  }

  pub async fn get_room_stats(
    &self,
    room_id: &str,
  ) -> Result<Option<Stored<RoomStats>>> {
    let record =
      self.store.read(ROOM_STATS, room_id).await.map_err(Error::store)?;
    Ok(record.map(|r| r.decode()).transpose()?)
  }
}
