//! Bot data service for Lobby.
//!
//! [`BotDatabase`] keeps user profiles, room statistics, command usage,
//! sessions, configuration and moderation history on top of any
//! [`lobby_core::store::DocumentStore`]. It holds no state of its own: every
//! read goes through the store.
//!
//! ```rust,ignore
//! let store = Arc::new(JsonStore::open("bot_data").await?);
//! let db = BotDatabase::new(store).await?;
//! db.register_user("u1", "ann", Fields::new()).await?;
//! ```

/// `serde_json::json!` for object literals, yielding the map directly.
macro_rules! patch {
  ($($body:tt)+) => {
    match ::serde_json::json!({ $($body)+ }) {
      ::serde_json::Value::Object(fields) => fields,
      _ => unreachable!("object literal"),
    }
  };
}

mod commands;
mod moderation;
mod reports;
mod rooms;
mod sessions;
mod settings;
mod users;

pub mod error;
pub mod models;
pub mod service;
pub mod tables;

pub use error::{Error, Result};
pub use service::BotDatabase;

#[cfg(test)]
mod tests;
