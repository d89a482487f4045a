//! Core types and trait definitions for the Lobby document store.
//!
//! This crate performs no I/O. Storage backends (e.g. `lobby-store-json`)
//! implement [`store::DocumentStore`]; the bot service layer depends on that
//! abstraction, not on any concrete backend.

// Native `async fn` in traits; the trait spells out `Send` bounds itself.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod record;
pub mod store;

pub use error::{Error, Result};
pub use record::{Fields, Metadata, Record, RecordId, Stored};
pub use store::{DocumentStore, Predicate, Snapshot, StoreStats, TableStats};
